//! Derived views over the canonical dataset and the pure query operations.
//!
//! A `View` is a small table: a set of dimension columns plus summed metric
//! totals per row. Every operation takes a view by reference and returns a
//! new one, so the dataset itself is never touched.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::data::CanonicalDataset;
use crate::domain::{Column, MetricTotals};
use crate::error::AppError;

/// Value of one dimension cell.
///
/// Months are kept as their number so that grouping sorts them in calendar
/// order; they are displayed by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum KeyValue {
    Date(NaiveDate),
    Year(i32),
    Month(u32),
    Text(String),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            KeyValue::Year(y) => write!(f, "{y}"),
            KeyValue::Month(m) => write!(f, "{}", month_name(*m)),
            KeyValue::Text(s) => f.write_str(s),
        }
    }
}

pub fn month_name(month: u32) -> &'static str {
    u8::try_from(month)
        .ok()
        .and_then(|m| chrono::Month::try_from(m).ok())
        .map(|m| m.name())
        .unwrap_or("?")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewRow {
    pub keys: Vec<KeyValue>,
    pub totals: MetricTotals,
}

impl ViewRow {
    pub fn key(&self, view: &View, column: Column) -> Option<&KeyValue> {
        view.column_position(column).and_then(|i| self.keys.get(i))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct View {
    columns: Vec<Column>,
    rows: Vec<ViewRow>,
}

impl View {
    /// Full-detail view: one row per canonical record with every dimension.
    pub fn from_dataset(dataset: &CanonicalDataset) -> Self {
        let rows = dataset
            .records()
            .iter()
            .map(|r| ViewRow {
                keys: vec![
                    KeyValue::Date(r.publication_date),
                    KeyValue::Year(r.year),
                    KeyValue::Month(r.publication_date.month()),
                    KeyValue::Text(r.region.clone()),
                    KeyValue::Text(r.sub_region.clone()),
                ],
                totals: r.totals(),
            })
            .collect();
        Self {
            columns: vec![Column::Date, Column::Year, Column::Month, Column::Region, Column::SubRegion],
            rows,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[ViewRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_position(&self, column: Column) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }

    /// Sum of every row's totals.
    pub fn grand_total(&self) -> MetricTotals {
        let mut total = MetricTotals::default();
        for row in &self.rows {
            total.add(&row.totals);
        }
        total
    }

    fn require(&self, operation: &str, columns: &[Column]) -> Result<Vec<usize>, AppError> {
        let missing: Vec<&str> = columns
            .iter()
            .filter(|c| self.column_position(**c).is_none())
            .map(|c| c.name())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::missing_columns(operation, &missing));
        }
        Ok(columns.iter().filter_map(|c| self.column_position(*c)).collect())
    }

    fn with_rows(&self, rows: Vec<ViewRow>) -> Self {
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }
}

/// Rows whose publication date falls in `year`.
pub fn filter_by_year(view: &View, year: i32) -> Result<View, AppError> {
    let idx = view.require("filter by year", &[Column::Date])?[0];
    let rows = view
        .rows
        .iter()
        .filter(|row| matches!(row.keys.get(idx), Some(KeyValue::Date(d)) if d.year() == year))
        .cloned()
        .collect();
    Ok(view.with_rows(rows))
}

/// Rows whose region equals `region`, ignoring case.
pub fn filter_by_region(view: &View, region: &str) -> Result<View, AppError> {
    let idx = view.require("filter by region", &[Column::Region])?[0];
    let wanted = region.to_lowercase();
    let rows = view
        .rows
        .iter()
        .filter(|row| matches!(row.keys.get(idx), Some(KeyValue::Text(r)) if r.to_lowercase() == wanted))
        .cloned()
        .collect();
    Ok(view.with_rows(rows))
}

/// Sum every metric per distinct `columns` tuple, in ascending key order.
///
/// The result carries only `columns` (duplicates collapsed, order kept).
pub fn group_by(view: &View, columns: &[Column]) -> Result<View, AppError> {
    let mut wanted: Vec<Column> = Vec::with_capacity(columns.len());
    for c in columns {
        if !wanted.contains(c) {
            wanted.push(*c);
        }
    }
    let idx = view.require("group by", &wanted)?;

    let mut groups: BTreeMap<Vec<KeyValue>, MetricTotals> = BTreeMap::new();
    for row in &view.rows {
        let key: Vec<KeyValue> = idx.iter().map(|&i| row.keys[i].clone()).collect();
        groups.entry(key).or_default().add(&row.totals);
    }

    Ok(View {
        columns: wanted,
        rows: groups.into_iter().map(|(keys, totals)| ViewRow { keys, totals }).collect(),
    })
}
