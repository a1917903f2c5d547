//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - fetch/ingest code stays free of presentation concerns
//! - output changes are localized (the tests below pin the layouts)

use crate::domain::{FetchOutcome, FiguresTable, TrendQuery};
use crate::io::reviews::LoadedReviews;
use crate::places::CollectOutcome;

use super::LocationSummary;

/// Header + per-region table + failure list for one trends fetch.
pub fn format_trends_summary(query: &TrendQuery, outcome: &FetchOutcome) -> String {
    let mut out = String::new();

    out.push_str("=== tb - Search interest ===\n");
    out.push_str(&format!("Term: {}\n", query.term()));
    out.push_str(&format!("Timeframe: {}\n", query.timeframe().display_name()));
    out.push_str(&format!(
        "Regions: {} requested | {} ok | {} failed\n\n",
        query.distinct_regions().len(),
        outcome.series.len(),
        outcome.failed_regions.len()
    ));

    push_row(&mut out, format!("{:<10} {:>7} {:>7} {:>7}", "region", "points", "latest", "mean"));
    push_row(&mut out, format!("{:-<10} {:-<7} {:-<7} {:-<7}", "", "", "", ""));
    for series in outcome.series.iter() {
        push_row(
            &mut out,
            format!(
                "{:<10} {:>7} {:>7} {:>7}",
                truncate(&series.region, 10),
                series.points.len(),
                series.latest_interest().map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
                series.mean_interest().map(|v| format!("{v:.1}")).unwrap_or_else(|| "-".to_string()),
            ),
        );
    }

    if !outcome.errors.is_empty() {
        out.push_str("\nFailed regions:\n");
        for err in &outcome.errors {
            out.push_str(&format!(
                "- {} ({}, {} attempt(s)): {}\n",
                err.region,
                err.kind.label(),
                err.attempts,
                err.summary
            ));
        }
    }

    out
}

/// Per-location review table.
pub fn format_review_summary(summaries: &[LocationSummary]) -> String {
    let mut out = String::new();
    push_row(&mut out, format!("{:<32} {:>7} {:>7}  {}", "location", "reviews", "avg", "1*/2*/3*/4*/5*"));
    push_row(&mut out, format!("{:-<32} {:-<7} {:-<7}  {:-<14}", "", "", "", ""));
    for s in summaries {
        let hist: Vec<String> = s.histogram.iter().map(|c| c.to_string()).collect();
        push_row(
            &mut out,
            format!(
                "{:<32} {:>7} {:>7.2}  {}",
                truncate(&s.location, 32),
                s.count,
                s.average_rating,
                hist.join("/")
            ),
        );
    }
    out
}

/// Ingest stats and rejected rows of a reviews CSV.
pub fn format_review_ingest(loaded: &LoadedReviews) -> String {
    let mut out = format!(
        "Reviews: {} row(s) read | {} valid | {} rejected\n",
        loaded.rows_read,
        loaded.rows.len(),
        loaded.row_errors.len()
    );
    for err in &loaded.row_errors {
        out.push_str(&format!("  line {}: {}\n", err.line, err.message));
    }
    out
}

pub fn format_collect_summary(outcome: &CollectOutcome) -> String {
    let mut out = String::new();
    out.push_str(&format!("Collected {} review(s).\n", outcome.rows.len()));
    for (location, rating) in &outcome.place_ratings {
        let rating = rating.map(|r| format!("{r:.1}")).unwrap_or_else(|| "-".to_string());
        out.push_str(&format!("  {location}: place rating {rating}\n"));
    }
    for location in &outcome.not_found {
        out.push_str(&format!("  {location}: no place found\n"));
    }
    for err in &outcome.errors {
        out.push_str(&format!("  {}: FAILED {}\n", err.location, err.message));
    }
    out
}

/// Figures table with a totals row.
pub fn format_figures(table: &FiguresTable) -> String {
    let mut out = String::new();

    let mut header = format!("{:<16}", truncate(&table.label_header, 16));
    let mut rule = format!("{:-<16}", "");
    for col in &table.columns {
        header.push_str(&format!(" {:>14}", truncate(col, 14)));
        rule.push_str(&format!(" {:-<14}", ""));
    }
    push_row(&mut out, header);
    push_row(&mut out, rule.clone());

    for row in &table.rows {
        let mut line = format!("{:<16}", truncate(&row.label, 16));
        for v in &row.values {
            line.push_str(&format!(" {:>14}", fmt_amount(*v)));
        }
        push_row(&mut out, line);
    }

    push_row(&mut out, rule);
    let mut totals = format!("{:<16}", "total");
    for v in table.column_totals() {
        totals.push_str(&format!(" {:>14}", fmt_amount(v)));
    }
    push_row(&mut out, totals);

    out
}

fn fmt_amount(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.2}"),
        None => "-".to_string(),
    }
}

fn push_row(out: &mut String, row: String) {
    out.push_str(row.trim_end());
    out.push('\n');
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::domain::{FailureKind, FigureRow, RegionError, Timeframe, TrendPoint};

    #[test]
    fn trends_summary_lists_regions_and_failures() {
        let query = TrendQuery::new("bowl", ["DE-BY", "DE-SN"], Timeframe::TwelveMonths).unwrap();
        let d = |day| NaiveDate::from_ymd_opt(2025, 2, day).unwrap();
        let mut outcome = FetchOutcome::default();
        outcome.series.insert(
            "DE-BY",
            vec![
                TrendPoint { date: d(2), interest: Some(50) },
                TrendPoint { date: d(9), interest: Some(70) },
            ],
        );
        outcome.record_failure(RegionError {
            region: "DE-SN".to_string(),
            kind: FailureKind::RateLimitExhausted,
            summary: "rate limited by upstream".to_string(),
            attempts: 3,
        });

        let txt = format_trends_summary(&query, &outcome);
        let expected = concat!(
            "=== tb - Search interest ===\n",
            "Term: bowl\n",
            "Timeframe: 12 months\n",
            "Regions: 2 requested | 1 ok | 1 failed\n",
            "\n",
            "region      points  latest    mean\n",
            "---------- ------- ------- -------\n",
            "DE-BY            2      70    60.0\n",
            "\n",
            "Failed regions:\n",
            "- DE-SN (rate limited, 3 attempt(s)): rate limited by upstream\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn figures_table_has_totals() {
        let table = FiguresTable {
            label_header: "Monat".to_string(),
            columns: vec!["Umsatz".to_string()],
            rows: vec![
                FigureRow { label: "Jan".to_string(), values: vec![Some(10.0)] },
                FigureRow { label: "Feb".to_string(), values: vec![None] },
            ],
        };
        let txt = format_figures(&table);
        let last = txt.lines().last().unwrap();
        assert_eq!(last, "total                     10.00");
        assert!(txt.contains("Feb                           -"));
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("Kaspar Schmauser", 8), "Kaspar .");
        assert_eq!(truncate("short", 8), "short");
    }
}
