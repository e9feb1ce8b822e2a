//! Reporting utilities: share breakdowns and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::{Column, Metric};
use crate::query::View;

/// One slice of a share breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct ShareSlice {
    pub label: String,
    pub value: u64,
    /// Percentage of the breakdown total (0 when the total is 0).
    pub percent: f64,
}

/// Percent share of `metric` per `axis` label, largest first.
///
/// Rows without the axis column are labelled `?`.
pub fn share_slices(view: &View, axis: Column, metric: Metric) -> Vec<ShareSlice> {
    let total: u64 = view.rows().iter().map(|r| r.totals.get(metric)).sum();
    let mut slices: Vec<ShareSlice> = view
        .rows()
        .iter()
        .map(|row| {
            let value = row.totals.get(metric);
            ShareSlice {
                label: row
                    .key(view, axis)
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "?".to_string()),
                value,
                percent: if total == 0 {
                    0.0
                } else {
                    100.0 * value as f64 / total as f64
                },
            }
        })
        .collect();
    slices.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.label.cmp(&b.label)));
    slices
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::data::CanonicalDataset;
    use crate::domain::{CanonicalRecord, MetricTotals};
    use crate::query::group_by;

    #[test]
    fn share_slices_sum_to_one_hundred() {
        let rec = |region: &str, total| {
            CanonicalRecord::new(
                NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
                region.to_string(),
                format!("{region} city"),
                MetricTotals {
                    total_reported: total,
                    ..MetricTotals::default()
                },
            )
        };
        let ds = CanonicalDataset::from_records(vec![rec("Utrecht", 30), rec("Zeeland", 10), rec("Limburg", 60)]);
        let view = group_by(&View::from_dataset(&ds), &[Column::Region]).unwrap();

        let slices = share_slices(&view, Column::Region, Metric::TotalReported);
        assert_eq!(slices[0].label, "Limburg");
        assert!((slices[0].percent - 60.0).abs() < 1e-9);
        let sum: f64 = slices.iter().map(|s| s.percent).sum();
        assert!((sum - 100.0).abs() < 1e-9);

        let zero = share_slices(&view, Column::Region, Metric::Deceased);
        assert!(zero.iter().all(|s| s.percent == 0.0));
    }
}
