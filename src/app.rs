//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - builds the dataset from the configured sources
//! - runs queries or forecasts
//! - prints tables/plots
//! - writes optional exports

use chrono::{Local, NaiveDate};
use clap::Parser;

use crate::cli::{Command, ForecastArgs, InfoArgs, PlotArgs, QueryArgs};
use crate::dashboard::Dashboard;
use crate::domain::Metric;
use crate::error::AppError;
use crate::query::{RegionScope, chart_title, share_axis, share_title};

pub mod pipeline;

/// Entry point for the `covid` binary.
pub fn run() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // `covid` alone (or with only source flags) behaves like `covid info ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Info(args) => handle_info(args),
        Command::Query(args) => handle_query(args),
        Command::Forecast(args) => handle_forecast(args),
        Command::Plot(args) => handle_plot(args),
    }
}

fn handle_info(args: InfoArgs) -> Result<(), AppError> {
    let dashboard = pipeline::load_dashboard(&args.source)?;
    println!("{}", crate::report::format_build_summary(&dashboard));
    Ok(())
}

fn handle_query(args: QueryArgs) -> Result<(), AppError> {
    let dashboard = pipeline::load_dashboard(&args.source)?;
    let year = resolve_year(&dashboard, args.year)?;
    let scope = RegionScope::parse(&args.region);

    if args.share {
        let view = dashboard.query_for_share(year, &args.region)?;
        for metric in &args.metrics {
            let slices = crate::report::share_slices(&view, share_axis(&scope), *metric);
            println!(
                "{}",
                crate::report::format_share(&share_title(*metric, year, &scope), &slices)
            );
        }
        if let Some(path) = &args.export {
            crate::io::export::write_view_csv(path, &view, &args.metrics)?;
        }
        return Ok(());
    }

    let view = dashboard.query_for_chart(year, &args.region, args.by)?;
    println!(
        "{}",
        crate::report::format_view(&chart_title(year, &scope, args.by), &view, &args.metrics)
    );
    if let Some(path) = &args.export {
        crate::io::export::write_view_csv(path, &view, &args.metrics)?;
    }
    Ok(())
}

fn handle_forecast(args: ForecastArgs) -> Result<(), AppError> {
    let dashboard = pipeline::load_dashboard(&args.source)?;
    let from = resolve_from_date(&args, Local::now().date_naive())?;
    let result = dashboard.predict(args.metric, from, args.days)?;

    println!(
        "{}",
        crate::report::format_forecast(&forecast_title(args.metric, args.days), &result)
    );
    if !args.no_plot {
        println!("{}", crate::plot::render_forecast_plot(&result, args.width, args.height));
    }

    if let Some(path) = &args.export {
        crate::io::export::write_forecast_csv(path, &result)?;
    }
    if let Some(path) = &args.export_json {
        crate::io::json::write_forecast_json(path, &result)?;
    }
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let file = crate::io::json::read_forecast_json(&args.forecast)?;
    println!("{}", forecast_title(file.result.metric, file.result.horizon_days));
    println!(
        "{}",
        crate::plot::render_forecast_plot(&file.result, args.width, args.height)
    );
    Ok(())
}

/// Requested year, or the latest year in the dataset.
fn resolve_year(dashboard: &Dashboard, requested: Option<i32>) -> Result<i32, AppError> {
    let years = dashboard.years();
    match requested {
        Some(year) if years.contains(&year) => Ok(year),
        Some(year) => {
            log::warn!("year {year} is not in the dataset; the result will be empty");
            Ok(year)
        }
        None => years
            .last()
            .copied()
            .ok_or_else(|| AppError::invalid_input("The dataset is empty; pass --year explicitly.")),
    }
}

/// `--from`, or `today - months_window`.
fn resolve_from_date(args: &ForecastArgs, today: NaiveDate) -> Result<NaiveDate, AppError> {
    if let Some(from) = args.from {
        return Ok(from);
    }
    crate::forecast::window_start(today, args.months_window)
        .ok_or_else(|| AppError::invalid_input(format!("Invalid --months-window {}.", args.months_window)))
}

fn forecast_title(metric: Metric, days: usize) -> String {
    format!("{days} days forecast of {} for The Netherlands", metric.column_name())
}

/// Rewrite argv so `covid` defaults to `covid info`.
///
/// Rules:
/// - `covid`                       -> `covid info`
/// - `covid --cases x.csv ...`     -> `covid info --cases x.csv ...`
/// - `covid --help/--version/-h`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("info".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "info".to_string());
    }
    argv
}
