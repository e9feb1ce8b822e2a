//! The interface the presentation layer talks to.
//!
//! A `Dashboard` owns the canonical dataset handle and the forecast engine
//! built on it. Everything it returns is a fresh value; the dataset is never
//! modified.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::data::{BuildStats, CanonicalDataset, DatasetBuilder, Fetch};
use crate::domain::{ForecastResult, Metric, SourceConfig};
use crate::error::AppError;
use crate::forecast::ForecastEngine;
use crate::query::{ALL_REGIONS_SCOPE, Breakdown, COUNTRY_SCOPE, RegionScope, View, query_for_chart, query_for_share};

#[derive(Debug, Clone)]
pub struct Dashboard {
    dataset: CanonicalDataset,
    engine: ForecastEngine,
    stats: BuildStats,
}

impl Dashboard {
    /// Fetch, clean and merge the sources, then wire up the forecast engine.
    pub fn load(fetcher: &impl Fetch, config: &SourceConfig) -> Result<Self, AppError> {
        let (dataset, stats) = DatasetBuilder::new(fetcher, config).build()?;
        Ok(Self::from_parts(dataset, stats))
    }

    pub fn from_parts(dataset: CanonicalDataset, stats: BuildStats) -> Self {
        let engine = ForecastEngine::new(dataset.clone());
        Self { dataset, engine, stats }
    }

    pub fn dataset(&self) -> &CanonicalDataset {
        &self.dataset
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    pub fn years(&self) -> BTreeSet<i32> {
        self.dataset.years()
    }

    /// Picker entries: the two fixed scopes, then provinces in dataset order.
    pub fn regions(&self) -> Vec<String> {
        [COUNTRY_SCOPE.to_string(), ALL_REGIONS_SCOPE.to_string()]
            .into_iter()
            .chain(self.dataset.regions())
            .collect()
    }

    pub fn query_for_chart(&self, year: i32, region: &str, breakdown: Breakdown) -> Result<View, AppError> {
        query_for_chart(&self.dataset, year, &RegionScope::parse(region), breakdown)
    }

    pub fn query_for_share(&self, year: i32, region: &str) -> Result<View, AppError> {
        query_for_share(&self.dataset, year, &RegionScope::parse(region))
    }

    pub fn predict(&self, metric: Metric, from_date: NaiveDate, horizon_days: usize) -> Result<ForecastResult, AppError> {
        self.engine.predict(metric, from_date, horizon_days)
    }
}
