//! Read/write forecast JSON files.
//!
//! Forecast JSON is the portable representation of one `predict` call:
//! - tool + model metadata (order, significance)
//! - the full result (history rows, forecast rows with bounds)
//!
//! `covid plot` reads it back to redraw the chart without refetching.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::ForecastResult;
use crate::error::AppError;
use crate::forecast::{ALPHA, ORDER};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastFile {
    pub tool: String,
    pub model: String,
    pub alpha: f64,
    pub result: ForecastResult,
}

impl ForecastFile {
    pub fn new(result: ForecastResult) -> Self {
        Self {
            tool: "covid".to_string(),
            model: ORDER.to_string(),
            alpha: ALPHA,
            result,
        }
    }
}

/// Write a forecast JSON file.
pub fn write_forecast_json(path: &Path, result: &ForecastResult) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::invalid_input(format!("Failed to create forecast JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, &ForecastFile::new(result.clone()))
        .map_err(|e| AppError::invalid_input(format!("Failed to write forecast JSON: {e}")))?;

    Ok(())
}

/// Read a forecast JSON file.
pub fn read_forecast_json(path: &Path) -> Result<ForecastFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::invalid_input(format!("Failed to open forecast JSON '{}': {e}", path.display())))?;
    let parsed: ForecastFile = serde_json::from_reader(file)
        .map_err(|e| AppError::invalid_input(format!("Invalid forecast JSON: {e}")))?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{ForecastPoint, Metric, Segment};

    #[test]
    fn forecast_file_carries_model_metadata() {
        let result = ForecastResult {
            metric: Metric::TotalReported,
            from_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            horizon_days: 1,
            confidence: 0.55,
            points: vec![ForecastPoint {
                date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
                segment: Segment::Forecast,
                value: Some(1.0),
                lower: Some(0.5),
                upper: Some(1.5),
            }],
        };

        let json = serde_json::to_value(ForecastFile::new(result)).unwrap();
        assert_eq!(json["model"], "ARIMA(4,1,4)");
        assert_eq!(json["result"]["metric"], "total_reported");
        assert_eq!(json["result"]["points"][0]["segment"], "forecast");
        assert_eq!(json["result"]["points"][0]["date"], "2023-01-01");
    }

    #[test]
    fn missing_file_is_reported() {
        let err = read_forecast_json(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.message().contains("Failed to open forecast JSON"));
    }
}
