//! Formatted terminal output for build summaries, query views and forecasts.
//!
//! We keep formatting code in one place so:
//! - the data/forecast code stays clean and testable
//! - output changes are localized (snapshot tests live here)

use crate::dashboard::Dashboard;
use crate::data::BuildStats;
use crate::domain::{Column, ForecastResult, Metric, Segment};
use crate::query::View;
use crate::report::ShareSlice;

/// Dataset summary printed by `covid info`.
pub fn format_build_summary(dashboard: &Dashboard) -> String {
    let dataset = dashboard.dataset();
    let stats: &BuildStats = dashboard.stats();
    let mut out = String::new();

    out.push_str("=== covid - Dutch COVID-19 trends ===\n");
    out.push_str(&format!("Records: {}\n", dataset.len()));
    match dataset.date_range() {
        Some((first, last)) => out.push_str(&format!("Dates: {first} .. {last}\n")),
        None => out.push_str("Dates: (none)\n"),
    }
    let years: Vec<String> = dashboard.years().iter().map(|y| y.to_string()).collect();
    out.push_str(&format!("Years: {}\n", years.join(", ")));
    out.push_str(&format!("Provinces: {}\n", dataset.regions().len()));

    out.push_str("\nCleaning:\n");
    out.push_str(&format!(
        "- cases/deaths : {} rows in, {} intermediate dropped, {} filled, {} grouped\n",
        stats.cases.rows_in, stats.cases.intermediate_dropped, stats.cases.sub_regions_filled, stats.cases.rows_out
    ));
    out.push_str(&format!(
        "- admissions   : {} rows in, {} intermediate dropped, {} grouped\n",
        stats.admissions.rows_in, stats.admissions.intermediate_dropped, stats.admissions.rows_out
    ));
    out.push_str(&format!(
        "- merge        : {} rows, {} admission keys unmatched, {} duplicate keys collapsed\n",
        stats.canonical_rows, stats.admissions_unmatched, stats.duplicate_keys_collapsed
    ));

    out.push_str("\nRegions: ");
    out.push_str(&dashboard.regions().join(", "));
    out.push('\n');
    out
}

/// Table of a query view: one column per dimension, then the requested metrics.
pub fn format_view(title: &str, view: &View, metrics: &[Metric]) -> String {
    let mut out = String::new();
    out.push_str(title);
    out.push('\n');

    let dims: Vec<(Column, usize)> = view.columns().iter().map(|c| (*c, dim_width(*c))).collect();

    let mut header = String::new();
    let mut rule = String::new();
    for (c, w) in &dims {
        header.push_str(&format!("{:<w$} ", c.name(), w = w));
        rule.push_str(&format!("{:-<w$} ", "", w = w));
    }
    for m in metrics {
        header.push_str(&format!("{:>18} ", m.column_name()));
        rule.push_str(&format!("{:-<18} ", ""));
    }
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(rule.trim_end());
    out.push('\n');

    if view.is_empty() {
        out.push_str("(no rows)\n");
        return out;
    }

    for row in view.rows() {
        let mut line = String::new();
        for ((_, w), key) in dims.iter().zip(&row.keys) {
            line.push_str(&format!("{:<w$} ", truncate(&key.to_string(), *w), w = w));
        }
        for m in metrics {
            line.push_str(&format!("{:>18} ", row.totals.get(*m)));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Share table with percentages (one decimal, like a pie chart label).
pub fn format_share(title: &str, slices: &[ShareSlice]) -> String {
    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    for s in slices {
        out.push_str(&format!("{:<32} {:>12} {:>6.1}%\n", truncate(&s.label, 32), s.value, s.percent));
    }
    if slices.is_empty() {
        out.push_str("(no rows)\n");
    }
    out
}

/// Forecast table: history rows show the observed value, forecast rows the
/// mean and band.
pub fn format_forecast(title: &str, result: &ForecastResult) -> String {
    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    out.push_str(&format!(
        "{} from {} | {} day(s) ahead | {:.0}% band\n",
        result.metric.column_name(),
        result.from_date,
        result.horizon_days,
        result.confidence * 100.0
    ));
    out.push_str(&format!("{:<10} {:<8} {:>12} {:>12} {:>12}\n", "date", "segment", "value", "lower", "upper"));
    out.push_str(&format!("{:-<10} {:-<8} {:-<12} {:-<12} {:-<12}\n", "", "", "", "", ""));

    for p in &result.points {
        let segment = match p.segment {
            Segment::History => "history",
            Segment::Forecast => "forecast",
        };
        out.push_str(
            format!(
                "{:<10} {:<8} {:>12} {:>12} {:>12}\n",
                p.date.to_string(),
                segment,
                fmt_opt(p.value),
                fmt_opt(p.lower),
                fmt_opt(p.upper),
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

fn dim_width(column: Column) -> usize {
    match column {
        Column::Date => 19,
        Column::Year => 4,
        Column::Month => 9,
        Column::Region => 16,
        Column::SubRegion => 28,
    }
    .max(column.name().len())
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.1}"),
        None => "-".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
