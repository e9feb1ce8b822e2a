//! ASCII plotting of a forecast for terminal output.
//!
//! Days run left to right on a fixed character grid; the output is a plain
//! string so it can be snapshot-tested.
//!
//! Markers:
//! - observed history: `-` line (broken at missing days)
//! - forecast mean: `o`
//! - forecast band bounds: `:`

use chrono::NaiveDate;

use crate::domain::ForecastResult;

/// Render a forecast result as a date-by-value line plot.
pub fn render_forecast_plot(result: &ForecastResult, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (Some(first), Some(last)) = (result.points.first(), result.points.last()) else {
        return "Plot: (no points)\n".to_string();
    };
    let (d_min, d_max) = (first.date, last.date);
    let x_of = |date: NaiveDate| (date - d_min).num_days() as f64;
    let x_max = x_of(d_max).max(1.0);

    let (y_min, y_max) = y_range(result).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Band first, then history, then means on top.
    for p in result.forecast() {
        let x = map_x(x_of(p.date), x_max, width);
        for bound in [p.lower, p.upper].into_iter().flatten() {
            grid[map_y(bound, y_min, y_max, height)][x] = ':';
        }
    }

    let mut prev: Option<(usize, usize)> = None;
    for p in result.history() {
        let Some(v) = p.value else {
            prev = None;
            continue;
        };
        let cell = (map_x(x_of(p.date), x_max, width), map_y(v, y_min, y_max, height));
        match prev {
            Some((x0, y0)) => draw_line(&mut grid, x0, y0, cell.0, cell.1, '-'),
            None => grid[cell.1][cell.0] = '-',
        }
        prev = Some(cell);
    }

    for p in result.forecast() {
        if let Some(v) = p.value {
            grid[map_y(v, y_min, y_max, height)][map_x(x_of(p.date), x_max, width)] = 'o';
        }
    }

    let mut out = String::new();
    out.push_str(&format!("Plot: dates=[{d_min}, {d_max}] | y=[{y_min:.2}, {y_max:.2}]\n"));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out.push_str("- history | o forecast | : band\n");
    out
}

fn y_range(result: &ForecastResult) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for p in &result.points {
        for v in [p.value, p.lower, p.upper].into_iter().flatten() {
            min_y = min_y.min(v);
            max_y = max_y.max(v);
        }
    }
    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else if min_y.is_finite() && max_y.is_finite() {
        // Flat series: center it.
        Some((min_y - 1.0, max_y + 1.0))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = (t / t_max).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ForecastPoint, Metric, Segment};

    fn point(day: u32, segment: Segment, value: f64, band: Option<(f64, f64)>) -> ForecastPoint {
        ForecastPoint {
            date: NaiveDate::from_ymd_opt(2023, 1, day).unwrap(),
            segment,
            value: Some(value),
            lower: band.map(|b| b.0),
            upper: band.map(|b| b.1),
        }
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let result = ForecastResult {
            metric: Metric::TotalReported,
            from_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            horizon_days: 2,
            confidence: 0.55,
            points: vec![
                point(1, Segment::History, 10.0, None),
                point(2, Segment::History, 20.0, None),
                point(3, Segment::Forecast, 25.0, Some((20.0, 30.0))),
                point(4, Segment::Forecast, 30.0, Some((22.0, 38.0))),
            ],
        };

        let txt = render_forecast_plot(&result, 10, 5);
        let expected = concat!(
            "Plot: dates=[2023-01-01, 2023-01-04] | y=[8.60, 39.40]\n",
            "         :\n",
            "      :  o\n",
            "      o  :\n",
            "  --  :   \n",
            "--        \n",
            "- history | o forecast | : band\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn empty_result_has_placeholder() {
        let result = ForecastResult {
            metric: Metric::Deceased,
            from_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            horizon_days: 1,
            confidence: 0.55,
            points: vec![],
        };
        assert_eq!(render_forecast_plot(&result, 20, 8), "Plot: (no points)\n");
    }
}
