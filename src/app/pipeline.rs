//! Shared "load" logic used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! config -> fetch (timeout/retry) -> clean -> merge -> dashboard
//!
//! The subcommands can then focus on presentation (tables, plots, exports).

use crate::cli::SourceArgs;
use crate::dashboard::Dashboard;
use crate::data::{Fetch, SourceClient};
use crate::domain::SourceConfig;
use crate::error::AppError;

/// Resolve configuration and build the dashboard from the live sources.
pub fn load_dashboard(args: &SourceArgs) -> Result<Dashboard, AppError> {
    let config = crate::config::source_config(args)?;
    let client = SourceClient::new(&config)?;
    load_dashboard_with(&client, &config)
}

/// Build the dashboard with an explicit fetcher.
pub fn load_dashboard_with(fetcher: &impl Fetch, config: &SourceConfig) -> Result<Dashboard, AppError> {
    log::info!(
        "building dataset from {} case source(s) and {} admission source(s)",
        config.case_uris.len(),
        config.admission_uris.len()
    );
    let dashboard = Dashboard::load(fetcher, config)?;
    if dashboard.dataset().is_empty() {
        log::warn!("no records survived cleaning; queries will be empty and forecasts will fail");
    }
    Ok(dashboard)
}
