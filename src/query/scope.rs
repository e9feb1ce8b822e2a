//! Region-scoped query combinators used by the dashboard front end.
//!
//! A scope name comes from the region picker: `Netherlands` (whole country),
//! `All provinces` (one row per province) or a single province name.

use std::fmt;

use serde::Serialize;

use crate::data::CanonicalDataset;
use crate::domain::{Column, Metric};
use crate::error::AppError;
use crate::query::view::{View, filter_by_region, filter_by_year, group_by};

pub const COUNTRY_SCOPE: &str = "Netherlands";
pub const ALL_REGIONS_SCOPE: &str = "All provinces";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RegionScope {
    Country,
    AllRegions,
    Region(String),
}

impl RegionScope {
    /// Resolve a picker label. The two fixed labels match case-insensitively;
    /// anything else is taken as a province name.
    pub fn parse(label: &str) -> Self {
        let trimmed = label.trim();
        if trimmed.eq_ignore_ascii_case(COUNTRY_SCOPE) {
            RegionScope::Country
        } else if trimmed.eq_ignore_ascii_case(ALL_REGIONS_SCOPE) {
            RegionScope::AllRegions
        } else {
            RegionScope::Region(trimmed.to_string())
        }
    }
}

impl fmt::Display for RegionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionScope::Country => f.write_str(COUNTRY_SCOPE),
            RegionScope::AllRegions => f.write_str(ALL_REGIONS_SCOPE),
            RegionScope::Region(name) => f.write_str(name),
        }
    }
}

/// How a single-region chart is broken down. Ignored for the other scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Breakdown {
    /// One row for the region.
    #[default]
    None,
    /// One row per municipality.
    SubRegions,
    /// One row per month.
    Months,
}

/// Bar-chart data for `year` under `scope`.
pub fn query_for_chart(
    dataset: &CanonicalDataset,
    year: i32,
    scope: &RegionScope,
    breakdown: Breakdown,
) -> Result<View, AppError> {
    let view = filter_by_year(&View::from_dataset(dataset), year)?;
    match scope {
        RegionScope::Country => group_by(&view, &[Column::Year]),
        RegionScope::AllRegions => group_by(&view, &[Column::Year, Column::Region]),
        RegionScope::Region(name) => {
            let view = filter_by_region(&view, name)?;
            match breakdown {
                Breakdown::SubRegions => group_by(&view, &[Column::Year, Column::Region, Column::SubRegion]),
                Breakdown::Months => group_by(&view, &[Column::Year, Column::Month]),
                Breakdown::None => group_by(&view, &[Column::Year, Column::Region]),
            }
        }
    }
}

/// Share (pie) data for `year`: provinces for the country-wide scopes,
/// municipalities for a single province.
pub fn query_for_share(dataset: &CanonicalDataset, year: i32, scope: &RegionScope) -> Result<View, AppError> {
    let view = filter_by_year(&View::from_dataset(dataset), year)?;
    match scope {
        RegionScope::Country | RegionScope::AllRegions => group_by(&view, &[Column::Year, Column::Region]),
        RegionScope::Region(name) => {
            let view = filter_by_region(&view, name)?;
            group_by(&view, &[Column::Year, Column::Region, Column::SubRegion])
        }
    }
}

/// Column that labels each bar of a chart query.
pub fn chart_axis(scope: &RegionScope, breakdown: Breakdown) -> Column {
    match (scope, breakdown) {
        (RegionScope::Country, _) => Column::Year,
        (RegionScope::AllRegions, _) => Column::Region,
        (RegionScope::Region(_), Breakdown::SubRegions) => Column::SubRegion,
        (RegionScope::Region(_), Breakdown::Months) => Column::Month,
        (RegionScope::Region(_), Breakdown::None) => Column::Region,
    }
}

pub fn chart_title(year: i32, scope: &RegionScope, breakdown: Breakdown) -> String {
    match (scope, breakdown) {
        (RegionScope::Country, _) => format!("The Netherlands in {year}"),
        (RegionScope::AllRegions, _) => format!("All provinces of The Netherlands in {year}"),
        (RegionScope::Region(name), Breakdown::SubRegions) => format!("Municipalities of {name} {year}"),
        (RegionScope::Region(name), Breakdown::Months) => format!("{name} {year} by month"),
        (RegionScope::Region(name), Breakdown::None) => format!("{name} in {year}"),
    }
}

/// Column that labels each slice of a share query.
pub fn share_axis(scope: &RegionScope) -> Column {
    match scope {
        RegionScope::Country | RegionScope::AllRegions => Column::Region,
        RegionScope::Region(_) => Column::SubRegion,
    }
}

pub fn share_title(metric: Metric, year: i32, scope: &RegionScope) -> String {
    match scope {
        RegionScope::Country | RegionScope::AllRegions => {
            format!("{} for provinces of The Netherlands {year}", metric.column_name())
        }
        RegionScope::Region(name) => format!("{} for municipalities of {name} {year}", metric.column_name()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{CanonicalRecord, MetricTotals};
    use crate::query::view::KeyValue;

    fn dataset() -> CanonicalDataset {
        let rec = |y, m, d, region: &str, sub: &str, total| {
            CanonicalRecord::new(
                NaiveDate::from_ymd_opt(y, m, d).unwrap(),
                region.to_string(),
                sub.to_string(),
                MetricTotals {
                    total_reported: total,
                    ..MetricTotals::default()
                },
            )
        };
        CanonicalDataset::from_records(vec![
            rec(2020, 12, 31, "Utrecht", "Zeist", 100),
            rec(2021, 1, 1, "Utrecht", "Utrecht city", 10),
            rec(2021, 1, 1, "Utrecht", "Zeist", 4),
            rec(2021, 2, 1, "Utrecht", "Zeist", 6),
            rec(2021, 1, 1, "Zeeland", "Goes", 7),
        ])
    }

    #[test]
    fn scope_labels_resolve_case_insensitively() {
        assert_eq!(RegionScope::parse("netherlands"), RegionScope::Country);
        assert_eq!(RegionScope::parse("ALL PROVINCES"), RegionScope::AllRegions);
        assert_eq!(RegionScope::parse(" Zeeland "), RegionScope::Region("Zeeland".to_string()));
        assert_eq!(RegionScope::AllRegions.to_string(), "All provinces");
    }

    #[test]
    fn country_chart_is_a_single_row_for_the_year() {
        let view = query_for_chart(&dataset(), 2021, &RegionScope::Country, Breakdown::Months).unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(view.rows()[0].totals.total_reported, 27);
        assert_eq!(view.columns(), [Column::Year]);
    }

    #[test]
    fn all_regions_chart_has_one_row_per_region() {
        let view = query_for_chart(&dataset(), 2021, &RegionScope::AllRegions, Breakdown::None).unwrap();
        let regions: Vec<String> = view.rows().iter().map(|r| r.keys[1].to_string()).collect();
        assert_eq!(regions, ["Utrecht", "Zeeland"]);
    }

    #[test]
    fn single_region_chart_honours_breakdown() {
        let scope = RegionScope::parse("utrecht");
        let ds = dataset();

        let plain = query_for_chart(&ds, 2021, &scope, Breakdown::None).unwrap();
        assert_eq!(plain.len(), 1);
        assert_eq!(plain.rows()[0].totals.total_reported, 20);

        let subs = query_for_chart(&ds, 2021, &scope, Breakdown::SubRegions).unwrap();
        assert_eq!(subs.len(), 2);
        let zeist = subs
            .rows()
            .iter()
            .find(|r| r.key(&subs, Column::SubRegion) == Some(&KeyValue::Text("Zeist".to_string())))
            .unwrap();
        assert_eq!(zeist.totals.total_reported, 10);

        let months = query_for_chart(&ds, 2021, &scope, Breakdown::Months).unwrap();
        assert_eq!(months.columns(), [Column::Year, Column::Month]);
        assert_eq!(months.rows()[0].keys[1], KeyValue::Month(1));
        assert_eq!(months.rows()[0].totals.total_reported, 14);
    }

    #[test]
    fn share_breaks_down_by_province_or_municipality() {
        let ds = dataset();
        let provinces = query_for_share(&ds, 2021, &RegionScope::Country).unwrap();
        assert_eq!(provinces.len(), 2);
        assert_eq!(share_axis(&RegionScope::Country), Column::Region);

        let municipalities = query_for_share(&ds, 2021, &RegionScope::parse("Utrecht")).unwrap();
        assert_eq!(municipalities.len(), 2);
        assert_eq!(
            share_title(Metric::Deceased, 2021, &RegionScope::parse("Utrecht")),
            "Deceased for municipalities of Utrecht 2021"
        );
    }

    #[test]
    fn chart_labels_follow_scope_and_breakdown() {
        let scope = RegionScope::parse("Zeeland");
        assert_eq!(chart_axis(&scope, Breakdown::Months), Column::Month);
        assert_eq!(chart_title(2021, &scope, Breakdown::Months), "Zeeland 2021 by month");
        assert_eq!(chart_axis(&RegionScope::Country, Breakdown::SubRegions), Column::Year);
    }
}
