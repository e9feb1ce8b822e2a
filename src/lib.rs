//! `covid-trends` library crate.
//!
//! The binary (`covid`) is a thin wrapper around this library so that:
//!
//! - loading, querying and forecasting are testable without network access
//! - the dashboard operations can be driven by other front ends
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod io;
pub mod math;
pub mod plot;
pub mod query;
pub mod report;
