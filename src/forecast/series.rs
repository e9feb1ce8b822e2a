//! Daily univariate series derived from the canonical dataset.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};

use crate::data::CanonicalDataset;
use crate::domain::Metric;

/// Contiguous daily series starting at `start`. Calendar days with no record
/// are `None`; they are never dropped or filled here.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    start: NaiveDate,
    values: Vec<Option<f64>>,
}

impl TimeSeries {
    pub fn new(start: NaiveDate, values: Vec<Option<f64>>) -> Self {
        Self { start, values }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last calendar day covered by the series.
    pub fn end(&self) -> NaiveDate {
        self.date_at(self.values.len().saturating_sub(1))
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn observed_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn date_at(&self, idx: usize) -> NaiveDate {
        self.start
            .checked_add_days(Days::new(idx as u64))
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, Option<f64>)> + '_ {
        self.values.iter().enumerate().map(|(i, v)| (self.date_at(i), *v))
    }
}

/// Sum `metric` over all regions per publication date and reindex to a daily
/// calendar from the first to the last date. `None` for an empty dataset.
pub fn to_daily_series(dataset: &CanonicalDataset, metric: Metric) -> Option<TimeSeries> {
    let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for record in dataset.records() {
        *per_day.entry(record.publication_date).or_default() += record.metric(metric);
    }

    let (&first, _) = per_day.first_key_value()?;
    let (&last, _) = per_day.last_key_value()?;

    let values = first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|d| per_day.get(&d).map(|v| *v as f64))
        .collect();

    Some(TimeSeries::new(first, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CanonicalRecord, MetricTotals};

    fn rec(day: u32, sub: &str, total: u64, deceased: u64) -> CanonicalRecord {
        CanonicalRecord::new(
            NaiveDate::from_ymd_opt(2022, 12, day).unwrap(),
            "Utrecht".to_string(),
            sub.to_string(),
            MetricTotals {
                total_reported: total,
                hospital_admission: 0,
                deceased,
            },
        )
    }

    #[test]
    fn sums_per_day_and_keeps_gaps_as_missing() {
        let ds = CanonicalDataset::from_records(vec![
            rec(1, "Utrecht city", 10, 1),
            rec(1, "Zeist", 5, 0),
            rec(4, "Zeist", 0, 0),
            rec(2, "Zeist", 3, 2),
        ]);
        let series = to_daily_series(&ds, Metric::TotalReported).unwrap();
        assert_eq!(series.start(), NaiveDate::from_ymd_opt(2022, 12, 1).unwrap());
        assert_eq!(series.end(), NaiveDate::from_ymd_opt(2022, 12, 4).unwrap());
        assert_eq!(series.values(), [Some(15.0), Some(3.0), None, Some(0.0)]);
        assert_eq!(series.observed_count(), 3);

        let deaths = to_daily_series(&ds, Metric::Deceased).unwrap();
        assert_eq!(deaths.values()[1], Some(2.0));
    }

    #[test]
    fn empty_dataset_has_no_series() {
        let ds = CanonicalDataset::from_records(Vec::new());
        assert!(to_daily_series(&ds, Metric::TotalReported).is_none());
    }
}
