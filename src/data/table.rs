//! Column-addressable raw tables read from `;`-delimited sources.
//!
//! A `RawTable` is the untyped stage of the pipeline: cells are strings, an
//! empty cell is a null, and columns are looked up by header name. Cleaning
//! turns it into typed records (see `clean`).

use std::collections::HashSet;

use csv::StringRecord;

use crate::error::AppError;

/// A source row plus where it came from (for error messages).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    cells: Vec<String>,
    source: usize,
    line: usize,
}

impl RawRow {
    /// Cell value, or `None` when the cell is empty (null).
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.cells.get(idx).map(String::as_str).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<RawRow>,
    sources: Vec<String>,
}

impl RawTable {
    /// Build a table from in-memory cells. Empty strings are nulls.
    pub fn new(origin: &str, columns: &[&str], rows: Vec<Vec<&str>>) -> Self {
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(idx, cells)| RawRow {
                cells: cells.into_iter().map(str::to_string).collect(),
                source: 0,
                line: idx + 2,
            })
            .collect();
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
            sources: vec![origin.to_string()],
        }
    }

    /// Parse a `;`-delimited UTF-8 document.
    ///
    /// Short records are padded with nulls. Records with non-empty cells past
    /// the last header column, and headers naming a column twice, are errors.
    pub fn from_csv(origin: &str, bytes: &[u8]) -> Result<Self, AppError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let headers = reader
            .headers()
            .map_err(|e| AppError::source_unavailable(format!("Failed to read header of '{origin}': {e}")))?
            .clone();
        let columns: Vec<String> = headers.iter().map(normalize_header_name).collect();
        if let Some(dup) = first_duplicate(&columns) {
            return Err(AppError::schema(format!(
                "Source '{origin}' names column `{dup}` more than once."
            )));
        }
        let width = columns.len();

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            // +2: records() starts after the header and lines are 1-based.
            let line = idx + 2;
            let record: StringRecord = result
                .map_err(|e| AppError::source_unavailable(format!("Failed to parse '{origin}' line {line}: {e}")))?;
            if record.iter().skip(width).any(|cell| !cell.is_empty()) {
                return Err(AppError::source_unavailable(format!(
                    "Failed to parse '{origin}' line {line}: {} fields, header has {width}.",
                    record.len()
                )));
            }
            let mut cells: Vec<String> = record.iter().take(width).map(str::to_string).collect();
            cells.resize(width, String::new());
            rows.push(RawRow { cells, source: 0, line });
        }

        log::debug!("parsed {} rows x {} columns from {origin}", rows.len(), width);

        Ok(Self {
            columns,
            rows,
            sources: vec![origin.to_string()],
        })
    }

    /// Concatenate same-schema tables, preserving row order.
    ///
    /// Column order may differ between sources; rows are realigned to the
    /// first table's order. A differing column set is a schema error.
    pub fn concat(tables: Vec<RawTable>) -> Result<Self, AppError> {
        let mut iter = tables.into_iter();
        let Some(mut out) = iter.next() else {
            return Err(AppError::invalid_input("No sources to concatenate."));
        };

        for table in iter {
            let mut positions = Vec::with_capacity(out.columns.len());
            for name in &out.columns {
                match table.column_index(name) {
                    Some(idx) => positions.push(idx),
                    None => {
                        return Err(AppError::schema(format!(
                            "Source '{}' does not match the schema of '{}': column `{name}` is missing.",
                            table.sources.first().map(String::as_str).unwrap_or("?"),
                            out.sources.first().map(String::as_str).unwrap_or("?"),
                        )));
                    }
                }
            }
            if table.columns.len() != out.columns.len() {
                return Err(AppError::schema(format!(
                    "Source '{}' has {} columns, expected {}.",
                    table.sources.first().map(String::as_str).unwrap_or("?"),
                    table.columns.len(),
                    out.columns.len(),
                )));
            }

            let offset = out.sources.len();
            out.sources.extend(table.sources);
            out.rows.extend(table.rows.into_iter().map(|row| RawRow {
                cells: positions.iter().map(|&i| row.cells[i].clone()).collect(),
                source: row.source + offset,
                line: row.line,
            }));
        }

        Ok(out)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Resolve every name in `names` to its index (same order), or fail naming
    /// all missing ones.
    pub fn require_columns(&self, context: &str, names: &[&str]) -> Result<Vec<usize>, AppError> {
        let missing: Vec<&str> = names.iter().copied().filter(|n| !self.has_column(n)).collect();
        if !missing.is_empty() {
            return Err(AppError::missing_columns(context, &missing));
        }
        Ok(names.iter().filter_map(|n| self.column_index(n)).collect())
    }

    /// Rename `from` to `to` when `from` exists and `to` does not.
    pub fn rename_column(&mut self, from: &str, to: &str) {
        if self.has_column(to) {
            return;
        }
        if let Some(idx) = self.column_index(from) {
            self.columns[idx] = to.to_string();
        }
    }

    /// Remove the named columns; names that are not present are ignored.
    ///
    /// Returns how many columns were removed.
    pub fn drop_columns(&mut self, names: &[&str]) -> usize {
        let keep: Vec<bool> = self.columns.iter().map(|c| !names.contains(&c.as_str())).collect();
        let dropped = keep.iter().filter(|k| !**k).count();
        if dropped == 0 {
            return 0;
        }

        self.columns = self
            .columns
            .drain(..)
            .zip(keep.iter())
            .filter_map(|(c, k)| k.then_some(c))
            .collect();
        for row in &mut self.rows {
            row.cells = row
                .cells
                .drain(..)
                .zip(keep.iter())
                .filter_map(|(c, k)| k.then_some(c))
                .collect();
        }
        dropped
    }

    /// Keep only rows matching `pred`; returns how many were removed.
    pub fn retain(&mut self, mut pred: impl FnMut(&RawRow) -> bool) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| pred(row));
        before - self.rows.len()
    }

    /// Fill empty cells of `target` using `fill(row)`; returns how many were filled.
    pub fn fill_nulls(&mut self, target: usize, mut fill: impl FnMut(&RawRow) -> Option<String>) -> usize {
        let mut filled = 0;
        for row in &mut self.rows {
            if row.get(target).is_some() {
                continue;
            }
            if let Some(value) = fill(row) {
                if let Some(cell) = row.cells.get_mut(target) {
                    *cell = value;
                    filled += 1;
                }
            }
        }
        filled
    }

    /// `origin:line` of a row, for error messages.
    pub fn location(&self, row: &RawRow) -> String {
        let origin = self.sources.get(row.source).map(String::as_str).unwrap_or("?");
        format!("{origin}:{}", row.line)
    }
}

fn first_duplicate(columns: &[String]) -> Option<&str> {
    let mut seen = HashSet::new();
    columns.iter().map(String::as_str).find(|c| !seen.insert(*c))
}

fn normalize_header_name(name: &str) -> String {
    // Some exports prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_csv_reads_semicolon_rows_and_strips_bom() {
        let doc = "\u{feff}Date_of_publication;Municipality_name;Total_reported\n2021-01-01;Utrecht;10\n2021-01-01;;5\n";
        let table = RawTable::from_csv("cases.csv", doc.as_bytes()).unwrap();
        assert_eq!(table.columns(), ["Date_of_publication", "Municipality_name", "Total_reported"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].get(1), Some("Utrecht"));
        assert_eq!(table.rows()[1].get(1), None);
        assert_eq!(table.location(&table.rows()[1]), "cases.csv:3");
    }

    #[test]
    fn from_csv_pads_short_rows_and_allows_trailing_empty_fields() {
        let doc = "a;b;c\n1;2\n3;4;5;\n";
        let table = RawTable::from_csv("t.csv", doc.as_bytes()).unwrap();
        assert_eq!(table.rows()[0].get(2), None);
        assert_eq!(table.rows()[1].get(2), Some("5"));
    }

    #[test]
    fn from_csv_rejects_rows_wider_than_the_header() {
        let doc = "a;b\n1;2\n3;4;5\n";
        let err = RawTable::from_csv("t.csv", doc.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::SourceUnavailable);
        assert!(err.message().contains("line 3"), "{}", err.message());
    }

    #[test]
    fn from_csv_rejects_duplicate_headers() {
        let doc = "Municipality_name;Province;Municipality_name\nA;B;C\n";
        let err = RawTable::from_csv("t.csv", doc.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Schema);
        assert!(err.message().contains("`Municipality_name`"));
    }

    #[test]
    fn concat_preserves_order_and_realigns_columns() {
        let a = RawTable::new("a", &["x", "y"], vec![vec!["1", "2"]]);
        let b = RawTable::new("b", &["y", "x"], vec![vec!["4", "3"], vec!["6", "5"]]);
        let table = RawTable::concat(vec![a, b]).unwrap();
        assert_eq!(table.len(), 3);
        let xs: Vec<_> = table.rows().iter().map(|r| r.get(0).unwrap()).collect();
        assert_eq!(xs, ["1", "3", "5"]);
        assert_eq!(table.location(&table.rows()[2]), "b:3");
    }

    #[test]
    fn concat_rejects_different_schemas() {
        let a = RawTable::new("a", &["x", "y"], vec![]);
        let b = RawTable::new("b", &["x", "z"], vec![]);
        let err = RawTable::concat(vec![a, b]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Schema);
    }

    #[test]
    fn drop_columns_ignores_absent_names() {
        let mut table = RawTable::new("t", &["a", "b", "c"], vec![vec!["1", "2", "3"]]);
        assert_eq!(table.drop_columns(&["b", "zzz"]), 1);
        assert_eq!(table.columns(), ["a", "c"]);
        assert_eq!(table.rows()[0].get(1), Some("3"));
    }

    #[test]
    fn require_columns_reports_all_missing() {
        let table = RawTable::new("t", &["a"], vec![]);
        let err = table.require_columns("ctx", &["a", "b", "c"]).unwrap_err();
        assert!(err.message().contains("`b`, `c`"));
    }
}
