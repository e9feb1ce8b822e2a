//! Per-source cleaning: raw tables in, typed and aggregated rows out.
//!
//! Each cleaner follows the same order:
//! 1. validate the columns it needs (fail fast, before touching any row)
//! 2. resolve rows without a municipality
//! 3. drop administrative columns
//! 4. parse cells and sum metrics per grouping key

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::data::table::{RawRow, RawTable};
use crate::domain::{MissingSubRegionPolicy, unknown_sub_region};
use crate::error::AppError;

pub const DATE_OF_PUBLICATION: &str = "Date_of_publication";
pub const DATE_OF_STATISTICS: &str = "Date_of_statistics";
pub const PROVINCE: &str = "Province";
pub const MUNICIPALITY_NAME: &str = "Municipality_name";
pub const TOTAL_REPORTED: &str = "Total_reported";
pub const DECEASED: &str = "Deceased";
pub const HOSPITAL_ADMISSION: &str = "Hospital_admission";

/// Administrative columns of the case/mortality source that nothing downstream reads.
pub const CASE_ADMIN_COLUMNS: [&str; 7] = [
    "Version",
    "Date_of_report",
    "Municipality_code",
    "Security_region_code",
    "Security_region_name",
    "Municipal_health_service",
    "ROAZ_region",
];

/// Administrative columns of the hospital admission source.
pub const ADMISSION_ADMIN_COLUMNS: [&str; 6] = [
    "Version",
    "Date_of_report",
    "Municipality_code",
    "Security_region_code",
    "Security_region_name",
    "Hospital_admission_notification",
];

const CASE_CONTEXT: &str = "case/mortality source";
const ADMISSION_CONTEXT: &str = "hospital admission source";

/// Cases and deaths summed per `(date, province, municipality)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRow {
    pub date: NaiveDate,
    pub region: String,
    pub sub_region: String,
    pub total_reported: u64,
    pub deceased: u64,
}

/// Admissions summed per `(date, municipality)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionRow {
    pub date: NaiveDate,
    pub sub_region: String,
    pub hospital_admission: u64,
}

/// Row counters for one cleaning pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub rows_in: usize,
    pub intermediate_dropped: usize,
    pub sub_regions_filled: usize,
    pub rows_out: usize,
}

/// Clean the case/mortality table.
pub fn clean_case_and_mortality(
    mut table: RawTable,
    policy: MissingSubRegionPolicy,
) -> Result<(Vec<CaseRow>, CleanStats), AppError> {
    let idx = table.require_columns(
        CASE_CONTEXT,
        &[DATE_OF_PUBLICATION, PROVINCE, MUNICIPALITY_NAME, TOTAL_REPORTED, DECEASED],
    )?;
    let (province, municipality) = (idx[1], idx[2]);

    let mut stats = CleanStats {
        rows_in: table.len(),
        ..CleanStats::default()
    };

    if policy == MissingSubRegionPolicy::Fill {
        stats.sub_regions_filled = table.fill_nulls(municipality, |row| row.get(province).map(unknown_sub_region));
    }
    // Under `Fill` this only removes rows that have no province either.
    stats.intermediate_dropped = table.retain(|row| row.get(municipality).is_some());

    table.drop_columns(&CASE_ADMIN_COLUMNS);

    let idx = table.require_columns(
        CASE_CONTEXT,
        &[DATE_OF_PUBLICATION, PROVINCE, MUNICIPALITY_NAME, TOTAL_REPORTED, DECEASED],
    )?;
    let (date, province, municipality, total, deceased) = (idx[0], idx[1], idx[2], idx[3], idx[4]);

    let mut groups: BTreeMap<(NaiveDate, String, String), (u64, u64)> = BTreeMap::new();
    for row in table.rows() {
        let loc = || table.location(row);
        let key = (
            parse_date(required(row, date, DATE_OF_PUBLICATION, &loc)?, &loc)?,
            required(row, province, PROVINCE, &loc)?.to_string(),
            required(row, municipality, MUNICIPALITY_NAME, &loc)?.to_string(),
        );
        let entry = groups.entry(key).or_default();
        entry.0 += parse_count(row.get(total), TOTAL_REPORTED, &loc)?;
        entry.1 += parse_count(row.get(deceased), DECEASED, &loc)?;
    }

    let rows: Vec<CaseRow> = groups
        .into_iter()
        .map(|((date, region, sub_region), (total_reported, deceased))| CaseRow {
            date,
            region,
            sub_region,
            total_reported,
            deceased,
        })
        .collect();
    stats.rows_out = rows.len();

    log::info!(
        "cleaned {CASE_CONTEXT}: {} rows in, {} intermediate dropped, {} filled, {} grouped rows",
        stats.rows_in,
        stats.intermediate_dropped,
        stats.sub_regions_filled,
        stats.rows_out
    );
    Ok((rows, stats))
}

/// Clean the hospital admission table.
///
/// The statistics date is renamed to the shared publication date name. Rows
/// without a municipality are intermediate rows and are always dropped; no
/// fill is applied to this source.
pub fn clean_hospital_admissions(mut table: RawTable) -> Result<(Vec<AdmissionRow>, CleanStats), AppError> {
    table.rename_column(DATE_OF_STATISTICS, DATE_OF_PUBLICATION);

    let idx = table.require_columns(
        ADMISSION_CONTEXT,
        &[DATE_OF_PUBLICATION, MUNICIPALITY_NAME, HOSPITAL_ADMISSION],
    )?;
    let municipality = idx[1];

    let mut stats = CleanStats {
        rows_in: table.len(),
        ..CleanStats::default()
    };
    stats.intermediate_dropped = table.retain(|row| row.get(municipality).is_some());

    table.drop_columns(&ADMISSION_ADMIN_COLUMNS);

    let idx = table.require_columns(
        ADMISSION_CONTEXT,
        &[DATE_OF_PUBLICATION, MUNICIPALITY_NAME, HOSPITAL_ADMISSION],
    )?;
    let (date, municipality, admissions) = (idx[0], idx[1], idx[2]);

    let mut groups: BTreeMap<(NaiveDate, String), u64> = BTreeMap::new();
    for row in table.rows() {
        let loc = || table.location(row);
        let key = (
            parse_date(required(row, date, DATE_OF_PUBLICATION, &loc)?, &loc)?,
            required(row, municipality, MUNICIPALITY_NAME, &loc)?.to_string(),
        );
        *groups.entry(key).or_default() += parse_count(row.get(admissions), HOSPITAL_ADMISSION, &loc)?;
    }

    let rows: Vec<AdmissionRow> = groups
        .into_iter()
        .map(|((date, sub_region), hospital_admission)| AdmissionRow {
            date,
            sub_region,
            hospital_admission,
        })
        .collect();
    stats.rows_out = rows.len();

    log::info!(
        "cleaned {ADMISSION_CONTEXT}: {} rows in, {} intermediate dropped, {} grouped rows",
        stats.rows_in,
        stats.intermediate_dropped,
        stats.rows_out
    );
    Ok((rows, stats))
}

fn required<'a>(row: &'a RawRow, idx: usize, name: &str, loc: &dyn Fn() -> String) -> Result<&'a str, AppError> {
    row.get(idx)
        .ok_or_else(|| AppError::schema(format!("Missing value for `{name}` at {}.", loc())))
}

pub(crate) fn parse_date(s: &str, loc: &dyn Fn() -> String) -> Result<NaiveDate, AppError> {
    // The sources use ISO dates; a few older exports used day-first dates.
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    Err(AppError::schema(format!(
        "Invalid date '{s}' at {}. Expected YYYY-MM-DD.",
        loc()
    )))
}

/// Parse a count cell. Empty cells count as zero, as a sum skips nulls.
fn parse_count(s: Option<&str>, name: &str, loc: &dyn Fn() -> String) -> Result<u64, AppError> {
    let Some(s) = s else { return Ok(0) };
    if let Ok(v) = s.parse::<u64>() {
        return Ok(v);
    }
    // Some exports write counts as floats (`5.0`).
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => Ok(v as u64),
        Ok(v) if v < 0.0 => Err(AppError::schema(format!(
            "Negative count {s} for `{name}` at {}.",
            loc()
        ))),
        _ => Err(AppError::schema(format!(
            "Invalid count '{s}' for `{name}` at {}.",
            loc()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const CASE_COLUMNS: [&str; 6] = [
        "Date_of_publication",
        "Municipality_code",
        "Municipality_name",
        "Province",
        "Total_reported",
        "Deceased",
    ];

    fn utrecht_cases() -> RawTable {
        RawTable::new(
            "cases",
            &CASE_COLUMNS,
            vec![
                vec!["2021-01-01", "GM0344", "Utrecht city", "Utrecht", "10", "0"],
                vec!["2021-01-01", "", "", "Utrecht", "5", "0"],
            ],
        )
    }

    #[test]
    fn intermediate_rows_are_dropped_by_default() {
        let (rows, stats) = clean_case_and_mortality(utrecht_cases(), MissingSubRegionPolicy::Drop).unwrap();
        assert_eq!(
            rows,
            vec![CaseRow {
                date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
                region: "Utrecht".to_string(),
                sub_region: "Utrecht city".to_string(),
                total_reported: 10,
                deceased: 0,
            }]
        );
        assert_eq!(stats.intermediate_dropped, 1);
        assert_eq!(stats.sub_regions_filled, 0);
    }

    #[test]
    fn fill_policy_keeps_rows_under_unknown_municipality() {
        let (rows, stats) = clean_case_and_mortality(utrecht_cases(), MissingSubRegionPolicy::Fill).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(stats.sub_regions_filled, 1);
        assert_eq!(stats.intermediate_dropped, 0);
        assert!(rows.iter().any(|r| r.sub_region == "Utrecht unknown-municipality" && r.total_reported == 5));
        assert!(rows.iter().all(|r| !r.sub_region.is_empty()));
    }

    #[test]
    fn fill_policy_still_drops_rows_without_province() {
        let table = RawTable::new(
            "cases",
            &CASE_COLUMNS,
            vec![
                vec!["2021-01-01", "", "", "", "7", "1"],
                vec!["2021-01-01", "GM0344", "Utrecht city", "Utrecht", "10", "0"],
            ],
        );
        let (rows, stats) = clean_case_and_mortality(table, MissingSubRegionPolicy::Fill).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(stats.intermediate_dropped, 1);
    }

    #[test]
    fn case_rows_are_summed_per_municipality_and_day() {
        let table = RawTable::new(
            "cases",
            &CASE_COLUMNS,
            vec![
                vec!["2021-01-02", "GM0344", "Utrecht city", "Utrecht", "3", "1"],
                vec!["2021-01-01", "GM0344", "Utrecht city", "Utrecht", "4", "0"],
                vec!["2021-01-02", "GM0344", "Utrecht city", "Utrecht", "2", ""],
            ],
        );
        let (rows, _) = clean_case_and_mortality(table, MissingSubRegionPolicy::Drop).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
        assert_eq!((rows[1].total_reported, rows[1].deceased), (5, 1));
    }

    #[test]
    fn missing_case_columns_fail_before_any_row_work() {
        let table = RawTable::new("cases", &["Date_of_publication", "Municipality_name"], vec![vec!["bad", ""]]);
        let err = clean_case_and_mortality(table, MissingSubRegionPolicy::Drop).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert!(err.message().contains("`Province`"));
        assert!(err.message().contains("`Total_reported`"));
    }

    #[test]
    fn admissions_rename_statistics_date_and_drop_intermediate_rows() {
        let table = RawTable::new(
            "admissions",
            &["Version", "Date_of_statistics", "Municipality_name", "Hospital_admission"],
            vec![
                vec!["3", "2021-01-01", "Utrecht city", "2"],
                vec!["3", "2021-01-01", "", "9"],
                vec!["3", "2021-01-01", "Utrecht city", "1"],
            ],
        );
        let (rows, stats) = clean_hospital_admissions(table).unwrap();
        assert_eq!(stats.intermediate_dropped, 1);
        assert_eq!(
            rows,
            vec![AdmissionRow {
                date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
                sub_region: "Utrecht city".to_string(),
                hospital_admission: 3,
            }]
        );
    }

    #[test]
    fn bad_cells_name_column_and_location() {
        let table = RawTable::new(
            "cases",
            &CASE_COLUMNS,
            vec![vec!["2021-01-01", "GM0344", "Utrecht city", "Utrecht", "-3", "0"]],
        );
        let err = clean_case_and_mortality(table, MissingSubRegionPolicy::Drop).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert!(err.message().contains("Total_reported"));
        assert!(err.message().contains("cases:2"));
    }

    #[test]
    fn float_formatted_counts_are_accepted() {
        let loc = || "x".to_string();
        assert_eq!(parse_count(Some("5.0"), "c", &loc).unwrap(), 5);
        assert_eq!(parse_count(None, "c", &loc).unwrap(), 0);
        assert!(parse_count(Some("abc"), "c", &loc).is_err());
    }
}
