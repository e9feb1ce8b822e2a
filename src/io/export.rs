//! Export query views and forecasts to CSV.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{ForecastResult, Metric, Segment};
use crate::error::AppError;
use crate::query::View;

/// Write a view: dimension columns, then one column per metric.
pub fn write_view_csv(path: &Path, view: &View, metrics: &[Metric]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::invalid_input(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_view(file, view, metrics)
}

fn write_view(out: impl Write, view: &View, metrics: &[Metric]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    let to_err = |e: csv::Error| AppError::invalid_input(format!("Failed to write export CSV: {e}"));

    let header: Vec<&str> = view
        .columns()
        .iter()
        .map(|c| c.name())
        .chain(metrics.iter().map(|m| m.column_name()))
        .collect();
    writer.write_record(&header).map_err(to_err)?;

    for row in view.rows() {
        let record: Vec<String> = row
            .keys
            .iter()
            .map(ToString::to_string)
            .chain(metrics.iter().map(|m| row.totals.get(*m).to_string()))
            .collect();
        writer.write_record(&record).map_err(to_err)?;
    }
    writer
        .flush()
        .map_err(|e| AppError::invalid_input(format!("Failed to flush export CSV: {e}")))
}

/// Write a forecast: one row per date, bounds empty for history rows.
pub fn write_forecast_csv(path: &Path, result: &ForecastResult) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::invalid_input(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_forecast(file, result)
}

fn write_forecast(mut out: impl Write, result: &ForecastResult) -> Result<(), AppError> {
    writeln!(out, "date,segment,metric,value,lower,upper")
        .map_err(|e| AppError::invalid_input(format!("Failed to write export CSV header: {e}")))?;

    let fmt = |v: Option<f64>| v.map(|x| format!("{x:.4}")).unwrap_or_default();
    for p in &result.points {
        let segment = match p.segment {
            Segment::History => "history",
            Segment::Forecast => "forecast",
        };
        writeln!(
            out,
            "{},{},{},{},{},{}",
            p.date,
            segment,
            result.metric.column_name(),
            fmt(p.value),
            fmt(p.lower),
            fmt(p.upper),
        )
        .map_err(|e| AppError::invalid_input(format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::data::CanonicalDataset;
    use crate::domain::{CanonicalRecord, Column, ForecastPoint, MetricTotals};
    use crate::query::group_by;

    #[test]
    fn view_csv_quotes_labels_and_lists_metrics() {
        let ds = CanonicalDataset::from_records(vec![CanonicalRecord::new(
            NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            "Noord-Brabant".to_string(),
            "Bergen, NH".to_string(),
            MetricTotals {
                total_reported: 3,
                hospital_admission: 1,
                deceased: 0,
            },
        )]);
        let view = group_by(&View::from_dataset(&ds), &[Column::SubRegion]).unwrap();

        let mut buf = Vec::new();
        write_view(&mut buf, &view, &[Metric::TotalReported, Metric::Deceased]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "Municipality_name,Total_reported,Deceased\n\"Bergen, NH\",3,0\n");
    }

    #[test]
    fn forecast_csv_leaves_history_bounds_empty() {
        let day = |d| NaiveDate::from_ymd_opt(2023, 1, d).unwrap();
        let result = ForecastResult {
            metric: Metric::HospitalAdmission,
            from_date: day(1),
            horizon_days: 1,
            confidence: 0.55,
            points: vec![
                ForecastPoint {
                    date: day(1),
                    segment: Segment::History,
                    value: Some(4.0),
                    lower: None,
                    upper: None,
                },
                ForecastPoint {
                    date: day(2),
                    segment: Segment::Forecast,
                    value: Some(5.5),
                    lower: Some(4.25),
                    upper: Some(6.75),
                },
            ],
        };
        let mut buf = Vec::new();
        write_forecast(&mut buf, &result).unwrap();
        let lines: Vec<String> = String::from_utf8(buf).unwrap().lines().map(str::to_string).collect();
        assert_eq!(lines[1], "2023-01-01,history,Hospital_admission,4.0000,,");
        assert_eq!(lines[2], "2023-01-02,forecast,Hospital_admission,5.5000,4.2500,6.7500");
    }
}
