//! Forecast engine: daily series → ARIMA(4,1,4) → history + band.
//!
//! Every `predict` call fits a fresh model on the full history; nothing is
//! cached between calls.

use chrono::{Days, Months, NaiveDate};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::data::CanonicalDataset;
use crate::domain::{ForecastPoint, ForecastResult, Metric, Segment};
use crate::error::AppError;
use crate::forecast::arima::{ArimaModel, ArimaOrder};
use crate::forecast::series::to_daily_series;

/// Model order used for every metric.
pub const ORDER: ArimaOrder = ArimaOrder::new(4, 1, 4);

/// Significance of the two-sided forecast band (a 55% interval).
pub const ALPHA: f64 = 0.45;

/// Longest forecast `predict` accepts (ten years of days).
pub const MAX_HORIZON_DAYS: usize = 3_650;

#[derive(Debug, Clone)]
pub struct ForecastEngine {
    dataset: CanonicalDataset,
}

impl ForecastEngine {
    pub fn new(dataset: CanonicalDataset) -> Self {
        Self { dataset }
    }

    /// History of `metric` stitched with a `horizon_days` forecast, keeping
    /// only dates on or after `from_date`.
    ///
    /// History rows carry the observed daily total (or `None` for a gap day);
    /// forecast rows carry the mean and both bounds.
    pub fn predict(&self, metric: Metric, from_date: NaiveDate, horizon_days: usize) -> Result<ForecastResult, AppError> {
        if horizon_days == 0 {
            return Err(AppError::invalid_input("Forecast horizon must be at least one day."));
        }
        if horizon_days > MAX_HORIZON_DAYS {
            return Err(AppError::invalid_input(format!(
                "Forecast horizon of {horizon_days} days exceeds the maximum of {MAX_HORIZON_DAYS}."
            )));
        }

        let series = to_daily_series(&self.dataset, metric)
            .ok_or_else(|| AppError::model_fit("The dataset has no observations to fit."))?;
        let last = series.end();
        if last.checked_add_days(Days::new(horizon_days as u64)).is_none() {
            return Err(AppError::invalid_input("Forecast horizon runs past the calendar."));
        }
        log::debug!(
            "fitting {ORDER} on {} days ({} observed) of {}",
            series.len(),
            series.observed_count(),
            metric.column_name()
        );

        let model = ArimaModel::fit(series.values(), ORDER)?;
        let z = two_sided_critical_value(ALPHA)?;

        let mut points: Vec<ForecastPoint> = series
            .iter()
            .filter(|(date, _)| *date >= from_date)
            .map(|(date, value)| ForecastPoint {
                date,
                segment: Segment::History,
                value,
                lower: None,
                upper: None,
            })
            .collect();

        for (i, step) in model.forecast(horizon_days).into_iter().enumerate() {
            let date = last
                .checked_add_days(Days::new(i as u64 + 1))
                .ok_or_else(|| AppError::invalid_input("Forecast horizon runs past the calendar."))?;
            if date < from_date {
                continue;
            }
            let (lower, upper) = step.interval(z);
            points.push(ForecastPoint {
                date,
                segment: Segment::Forecast,
                value: Some(step.mean),
                lower: Some(lower),
                upper: Some(upper),
            });
        }

        Ok(ForecastResult {
            metric,
            from_date,
            horizon_days,
            confidence: 1.0 - ALPHA,
            points,
        })
    }
}

/// `z` with `P(|Z| <= z) = 1 - alpha` for a standard normal `Z`.
pub fn two_sided_critical_value(alpha: f64) -> Result<f64, AppError> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(AppError::model_fit(format!("Invalid significance level {alpha}.")));
    }
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::model_fit(format!("Standard normal unavailable: {e}")))?;
    Ok(normal.inverse_cdf(1.0 - alpha / 2.0))
}

/// Start of a trailing window of `months` calendar months ending at `today`.
pub fn window_start(today: NaiveDate, months: u32) -> Option<NaiveDate> {
    today.checked_sub_months(Months::new(months))
}
