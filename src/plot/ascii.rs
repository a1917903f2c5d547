//! ASCII plotting of trend series for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual checks after `tb trends`
//! - deterministic output (helpful for golden tests)
//!
//! Each region gets a digit marker (`1`, `2`, ...; `*` past nine) used for its
//! samples and the line between them. Missing samples break the line. The
//! y-axis is always the full 0-100 interest scale so plots are comparable.

use chrono::{Datelike, NaiveDate};

use crate::domain::TrendSeries;

const Y_MIN: f64 = 0.0;
const Y_MAX: f64 = 100.0;

/// Render all regions of `series` on one grid, with a legend below.
pub fn render_trend_plot(series: &TrendSeries, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let dates = series.date_grid();
    let (Some(first), Some(last)) = (dates.first().copied(), dates.last().copied()) else {
        return "Plot: no data\n".to_string();
    };
    let x_min = day_number(first);
    // A single date still needs a non-empty range.
    let x_max = day_number(last).max(x_min + 1.0);

    let mut grid = vec![vec![' '; width]; height];
    let mut legend = Vec::new();

    for (idx, region) in series.iter().enumerate() {
        let marker = marker_for(idx);
        legend.push(format!("{marker}={}", region.region));

        let mut prev: Option<(usize, usize)> = None;
        for p in &region.points {
            let Some(v) = p.interest else {
                prev = None;
                continue;
            };
            let x = map_x(day_number(p.date), x_min, x_max, width);
            let y = map_y(f64::from(v), Y_MIN, Y_MAX, height);
            match prev {
                Some((x0, y0)) => draw_line(&mut grid, x0, y0, x, y, marker),
                None => grid[y][x] = marker,
            }
            prev = Some((x, y));
        }
    }

    let mut out = String::new();
    out.push_str(&format!("Plot: {first} .. {last} | interest=[0, 100]\n"));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    out.push_str(&legend.join("  "));
    out.push('\n');
    out
}

fn marker_for(idx: usize) -> char {
    if idx < 9 {
        char::from(b'1' + idx as u8)
    } else {
        '*'
    }
}

/// Days since the common era; used as the numeric x coordinate for dates.
pub(crate) fn day_number(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce())
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish). Only fills empty cells, so an
/// earlier region's line is never overwritten by a later one.
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
    use crate::domain::TrendPoint;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let mut series = TrendSeries::default();
        series.insert(
            "DE-BY",
            vec![
                TrendPoint { date: d(1), interest: Some(100) },
                TrendPoint { date: d(10), interest: Some(100) },
            ],
        );
        series.insert(
            "DE-BE",
            vec![
                TrendPoint { date: d(1), interest: Some(0) },
                TrendPoint { date: d(4), interest: None },
                TrendPoint { date: d(10), interest: Some(0) },
            ],
        );

        let txt = render_trend_plot(&series, 10, 5);
        let expected = concat!(
            "Plot: 2025-01-01 .. 2025-01-10 | interest=[0, 100]\n",
            "1111111111\n",
            "\n",
            "\n",
            "\n",
            "2        2\n",
            "1=DE-BY  2=DE-BE\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn empty_series_renders_placeholder() {
        assert_eq!(render_trend_plot(&TrendSeries::default(), 20, 5), "Plot: no data\n");
    }

    #[test]
    fn markers_run_out_to_star() {
        assert_eq!(marker_for(0), '1');
        assert_eq!(marker_for(8), '9');
        assert_eq!(marker_for(9), '*');
    }
}
