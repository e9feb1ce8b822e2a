//! Source configuration: defaults, then environment (`.env` supported), then
//! CLI flags.

use std::time::Duration;

use crate::cli::SourceArgs;
use crate::domain::SourceConfig;
use crate::error::AppError;

pub const ENV_CASES_URIS: &str = "COVID_CASES_URIS";
pub const ENV_ADMISSIONS_URIS: &str = "COVID_ADMISSIONS_URIS";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "COVID_FETCH_TIMEOUT_SECS";
pub const ENV_FETCH_RETRIES: &str = "COVID_FETCH_RETRIES";

/// Build the source configuration for a CLI invocation.
pub fn source_config(args: &SourceArgs) -> Result<SourceConfig, AppError> {
    dotenvy::dotenv().ok();
    let config = from_vars(|key| std::env::var(key).ok())?;
    apply_args(config, args)
}

/// Defaults overridden by whichever variables `get` returns.
pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<SourceConfig, AppError> {
    let mut config = SourceConfig::default();

    if let Some(list) = get(ENV_CASES_URIS).and_then(|v| split_uris(&v)) {
        config.case_uris = list;
    }
    if let Some(list) = get(ENV_ADMISSIONS_URIS).and_then(|v| split_uris(&v)) {
        config.admission_uris = list;
    }
    if let Some(raw) = get(ENV_FETCH_TIMEOUT_SECS) {
        let secs: u64 = raw.trim().parse().map_err(|_| {
            AppError::invalid_input(format!("{ENV_FETCH_TIMEOUT_SECS} must be a whole number of seconds, got '{raw}'."))
        })?;
        config.timeout = timeout_from_secs(secs)?;
    }
    if let Some(raw) = get(ENV_FETCH_RETRIES) {
        config.retries = raw.trim().parse().map_err(|_| {
            AppError::invalid_input(format!("{ENV_FETCH_RETRIES} must be a non-negative integer, got '{raw}'."))
        })?;
    }

    Ok(config)
}

fn apply_args(mut config: SourceConfig, args: &SourceArgs) -> Result<SourceConfig, AppError> {
    if !args.cases.is_empty() {
        config.case_uris = args.cases.clone();
    }
    if !args.admissions.is_empty() {
        config.admission_uris = args.admissions.clone();
    }
    if let Some(secs) = args.timeout {
        config.timeout = timeout_from_secs(secs)?;
    }
    if let Some(retries) = args.retries {
        config.retries = retries;
    }
    config.missing_sub_region = args.unknown_municipalities;
    Ok(config)
}

fn timeout_from_secs(secs: u64) -> Result<Duration, AppError> {
    if secs == 0 {
        return Err(AppError::invalid_input("Fetch timeout must be at least one second."));
    }
    Ok(Duration::from_secs(secs))
}

fn split_uris(value: &str) -> Option<Vec<String>> {
    let uris: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (!uris.is_empty()).then_some(uris)
}
