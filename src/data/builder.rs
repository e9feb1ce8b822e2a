//! Dataset construction: load → validate → clean → merge.
//!
//! The builder runs once at startup and hands out an immutable
//! `CanonicalDataset`. Any failure aborts the whole build; a partial dataset is
//! never returned.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::data::clean::{
    AdmissionRow, CaseRow, CleanStats, DATE_OF_PUBLICATION, DATE_OF_STATISTICS, MUNICIPALITY_NAME,
    clean_case_and_mortality, clean_hospital_admissions,
};
use crate::data::dataset::CanonicalDataset;
use crate::data::source::{Fetch, load};
use crate::data::table::RawTable;
use crate::domain::{CanonicalRecord, MetricTotals, MissingSubRegionPolicy, SourceConfig};
use crate::error::AppError;

/// Columns both sources are joined on.
pub const MERGE_COLUMNS: [&str; 2] = [DATE_OF_PUBLICATION, MUNICIPALITY_NAME];

/// What happened during one build, for logging and `info` output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub cases: CleanStats,
    pub admissions: CleanStats,
    /// Admission keys with no case row (lost by the left join).
    pub admissions_unmatched: usize,
    /// Case rows folded into another row sharing the same merge key.
    pub duplicate_keys_collapsed: usize,
    pub canonical_rows: usize,
}

pub struct DatasetBuilder<'a, F: Fetch> {
    fetcher: &'a F,
    config: &'a SourceConfig,
}

impl<'a, F: Fetch> DatasetBuilder<'a, F> {
    pub fn new(fetcher: &'a F, config: &'a SourceConfig) -> Self {
        Self { fetcher, config }
    }

    /// Fetch both sources and build the canonical dataset.
    pub fn build(&self) -> Result<(CanonicalDataset, BuildStats), AppError> {
        let cases = load(self.fetcher, &self.config.case_uris)?;
        let admissions = load(self.fetcher, &self.config.admission_uris)?;
        build_dataset(cases, admissions, self.config.missing_sub_region)
    }
}

/// Build the canonical dataset from already-loaded raw tables.
///
/// The merge key is checked on both tables before any row is touched.
pub fn build_dataset(
    cases: RawTable,
    mut admissions: RawTable,
    policy: MissingSubRegionPolicy,
) -> Result<(CanonicalDataset, BuildStats), AppError> {
    admissions.rename_column(DATE_OF_STATISTICS, DATE_OF_PUBLICATION);
    validate_merge_keys(&cases, &admissions)?;

    let (case_rows, case_stats) = clean_case_and_mortality(cases, policy)?;
    let (admission_rows, admission_stats) = clean_hospital_admissions(admissions)?;

    let (records, mut stats) = merge_records(&case_rows, &admission_rows);
    stats.cases = case_stats;
    stats.admissions = admission_stats;

    if records.is_empty() {
        log::warn!("canonical dataset is empty after cleaning");
    }
    log::info!(
        "built canonical dataset: {} rows ({} admission keys unmatched, {} duplicate keys collapsed)",
        stats.canonical_rows,
        stats.admissions_unmatched,
        stats.duplicate_keys_collapsed
    );

    Ok((CanonicalDataset::from_records(records), stats))
}

/// Fail unless both tables carry the merge key columns.
pub fn validate_merge_keys(cases: &RawTable, admissions: &RawTable) -> Result<(), AppError> {
    cases.require_columns("merge key on case/mortality source", &MERGE_COLUMNS)?;
    admissions.require_columns("merge key on hospital admission source", &MERGE_COLUMNS)?;
    Ok(())
}

/// Left-outer join of cases with admissions on `(date, municipality)`.
///
/// Every case key appears exactly once in the output, ordered by
/// `(date, municipality)`. Unmatched keys get zero admissions. When two case
/// rows share a key (same municipality under two provinces) their cases and
/// deaths are summed, the admission count is taken once and the first
/// province is kept.
pub fn merge_records(cases: &[CaseRow], admissions: &[AdmissionRow]) -> (Vec<CanonicalRecord>, BuildStats) {
    let admission_index: HashMap<(NaiveDate, &str), u64> = admissions
        .iter()
        .map(|a| ((a.date, a.sub_region.as_str()), a.hospital_admission))
        .collect();

    let mut merged: BTreeMap<(NaiveDate, &str), (&str, MetricTotals)> = BTreeMap::new();
    let mut stats = BuildStats::default();

    for case in cases {
        let key = (case.date, case.sub_region.as_str());
        let totals = MetricTotals {
            total_reported: case.total_reported,
            hospital_admission: 0,
            deceased: case.deceased,
        };
        match merged.get_mut(&key) {
            Some((_, existing)) => {
                existing.total_reported += totals.total_reported;
                existing.deceased += totals.deceased;
                stats.duplicate_keys_collapsed += 1;
            }
            None => {
                let hospital_admission = admission_index.get(&key).copied().unwrap_or(0);
                merged.insert(
                    key,
                    (
                        case.region.as_str(),
                        MetricTotals {
                            hospital_admission,
                            ..totals
                        },
                    ),
                );
            }
        }
    }

    stats.admissions_unmatched = admission_index.keys().filter(|k| !merged.contains_key(*k)).count();

    let records: Vec<CanonicalRecord> = merged
        .into_iter()
        .map(|((date, sub_region), (region, totals))| {
            CanonicalRecord::new(date, region.to_string(), sub_region.to_string(), totals)
        })
        .collect();
    stats.canonical_rows = records.len();

    (records, stats)
}
