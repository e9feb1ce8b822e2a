//! Shared domain types.
//!
//! These types are kept small and serializable so they can be:
//!
//! - held in the immutable in-memory dataset
//! - returned from queries and forecasts
//! - exported to CSV/JSON by the front end

use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Default archival + rolling sources for cases and deaths per municipality.
pub const DEFAULT_CASE_URIS: [&str; 2] = [
    "https://data.rivm.nl/data/covid-19/COVID-19_aantallen_gemeente_per_dag_tm_03102021.csv",
    "https://data.rivm.nl/covid-19/COVID-19_aantallen_gemeente_per_dag.csv",
];

/// Default archival + rolling sources for hospital admissions per municipality.
pub const DEFAULT_ADMISSION_URIS: [&str; 2] = [
    "https://data.rivm.nl/data/covid-19/COVID-19_ziekenhuisopnames_tm_03102021.csv",
    "https://data.rivm.nl/covid-19/COVID-19_ziekenhuisopnames.csv",
];

/// A numeric measure carried by every canonical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TotalReported,
    HospitalAdmission,
    Deceased,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::TotalReported, Metric::HospitalAdmission, Metric::Deceased];

    /// Column name used by the source files.
    pub fn column_name(self) -> &'static str {
        match self {
            Metric::TotalReported => "Total_reported",
            Metric::HospitalAdmission => "Hospital_admission",
            Metric::Deceased => "Deceased",
        }
    }
}

/// What to do with case rows whose municipality is empty.
///
/// `Drop` treats them as the intermediate/total rows the source inserts and
/// removes them. `Fill` keeps them under `"<province> unknown-municipality"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MissingSubRegionPolicy {
    #[default]
    Drop,
    Fill,
}

/// Suffix appended to a province name to label rows without a municipality.
pub const UNKNOWN_SUB_REGION_SUFFIX: &str = "unknown-municipality";

pub fn unknown_sub_region(region: &str) -> String {
    format!("{region} {UNKNOWN_SUB_REGION_SUFFIX}")
}

/// Grouping dimensions available on the canonical dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Date,
    Year,
    Month,
    Region,
    SubRegion,
}

impl Column {
    pub fn name(self) -> &'static str {
        match self {
            Column::Date => "Date_of_publication",
            Column::Year => "Year",
            Column::Month => "Month",
            Column::Region => "Province",
            Column::SubRegion => "Municipality_name",
        }
    }
}

/// Summed counts for the three metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetricTotals {
    pub total_reported: u64,
    pub hospital_admission: u64,
    pub deceased: u64,
}

impl MetricTotals {
    pub fn get(&self, metric: Metric) -> u64 {
        match metric {
            Metric::TotalReported => self.total_reported,
            Metric::HospitalAdmission => self.hospital_admission,
            Metric::Deceased => self.deceased,
        }
    }

    pub fn add(&mut self, other: &MetricTotals) {
        self.total_reported += other.total_reported;
        self.hospital_admission += other.hospital_admission;
        self.deceased += other.deceased;
    }
}

/// One merged row per `(publication_date, sub_region)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub publication_date: NaiveDate,
    pub region: String,
    pub sub_region: String,
    pub total_reported: u64,
    pub hospital_admission: u64,
    pub deceased: u64,
    pub year: i32,
    /// Full month name, e.g. `March`.
    pub month: String,
}

impl CanonicalRecord {
    pub fn new(publication_date: NaiveDate, region: String, sub_region: String, totals: MetricTotals) -> Self {
        Self {
            year: publication_date.year(),
            month: publication_date.format("%B").to_string(),
            publication_date,
            region,
            sub_region,
            total_reported: totals.total_reported,
            hospital_admission: totals.hospital_admission,
            deceased: totals.deceased,
        }
    }

    pub fn totals(&self) -> MetricTotals {
        MetricTotals {
            total_reported: self.total_reported,
            hospital_admission: self.hospital_admission,
            deceased: self.deceased,
        }
    }

    pub fn metric(&self, metric: Metric) -> u64 {
        self.totals().get(metric)
    }
}

/// Where a forecast row comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    History,
    Forecast,
}

/// One dated row of a forecast result.
///
/// History rows carry the observed value (or `None` for a calendar gap) and no
/// bounds. Forecast rows carry the predicted mean and both bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub segment: Segment,
    pub value: Option<f64>,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

/// Historical series stitched with the forecast band, truncated to `from_date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub metric: Metric,
    pub from_date: NaiveDate,
    pub horizon_days: usize,
    /// Two-sided coverage of the band (`1 - alpha`).
    pub confidence: f64,
    pub points: Vec<ForecastPoint>,
}

impl ForecastResult {
    pub fn history(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(|p| p.segment == Segment::History)
    }

    pub fn forecast(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(|p| p.segment == Segment::Forecast)
    }
}

/// Where the raw sources come from and how they are fetched.
///
/// Built from defaults, then environment, then CLI flags.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub case_uris: Vec<String>,
    pub admission_uris: Vec<String>,
    /// Per-request timeout for remote sources.
    pub timeout: Duration,
    /// Extra attempts after the first failed fetch of a source.
    pub retries: u32,
    /// Base delay between attempts (multiplied by the attempt number).
    pub retry_backoff: Duration,
    pub missing_sub_region: MissingSubRegionPolicy,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            case_uris: DEFAULT_CASE_URIS.iter().map(|s| s.to_string()).collect(),
            admission_uris: DEFAULT_ADMISSION_URIS.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_secs(60),
            retries: 2,
            retry_backoff: Duration::from_secs(2),
            missing_sub_region: MissingSubRegionPolicy::Drop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_record_derives_year_and_month() {
        let date = NaiveDate::from_ymd_opt(2021, 3, 14).unwrap();
        let rec = CanonicalRecord::new(
            date,
            "Utrecht".to_string(),
            "Utrecht".to_string(),
            MetricTotals { total_reported: 4, hospital_admission: 1, deceased: 0 },
        );
        assert_eq!(rec.year, 2021);
        assert_eq!(rec.month, "March");
        assert_eq!(rec.metric(Metric::HospitalAdmission), 1);
    }

    #[test]
    fn unknown_sub_region_is_labelled_by_region() {
        assert_eq!(unknown_sub_region("Zeeland"), "Zeeland unknown-municipality");
    }
}
