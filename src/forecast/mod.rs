//! Forecasting: daily series, ARIMA estimation and the forecast engine.

pub mod arima;
pub mod engine;
pub mod series;

pub use arima::*;
pub use engine::*;
pub use series::*;
