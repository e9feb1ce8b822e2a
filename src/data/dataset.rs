//! The canonical, immutable dataset every query and forecast reads from.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::CanonicalRecord;

/// Shared read-only handle to the merged records.
///
/// Cloning is cheap (reference count); the records are never mutated after
/// construction.
#[derive(Debug, Clone)]
pub struct CanonicalDataset {
    records: Arc<[CanonicalRecord]>,
}

impl CanonicalDataset {
    pub fn from_records(records: Vec<CanonicalRecord>) -> Self {
        Self {
            records: records.into(),
        }
    }

    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct years, ascending.
    pub fn years(&self) -> BTreeSet<i32> {
        self.records.iter().map(|r| r.year).collect()
    }

    /// Distinct region names in order of first appearance.
    pub fn regions(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter(|r| seen.insert(r.region.as_str()))
            .map(|r| r.region.clone())
            .collect()
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.records.iter().map(|r| r.publication_date).min()?;
        let max = self.records.iter().map(|r| r.publication_date).max()?;
        Some((min, max))
    }
}
