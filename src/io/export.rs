//! CSV exports.
//!
//! The exports are meant to be easy to consume in spreadsheets:
//! - trends: one row per date, one column per region
//! - reviews: the same columns `load_reviews` reads back
//! - figures: the loaded table, numbers with a `.` decimal mark

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;

use crate::domain::{FetchOutcome, FiguresTable, ReviewRow};
use crate::error::AppError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Write the successful regions of `outcome` as a date x region table.
///
/// Dates are the union over all regions; a region with no sample (or an
/// absent value) for a date gets an empty cell.
pub fn write_trends_csv(path: &Path, outcome: &FetchOutcome) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::runtime(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_trends(csv::Writer::from_writer(file), outcome)
}

fn write_trends<W: std::io::Write>(mut writer: csv::Writer<W>, outcome: &FetchOutcome) -> Result<(), AppError> {
    let regions = outcome.series.region_codes();

    let mut header = Vec::with_capacity(regions.len() + 1);
    header.push("date");
    header.extend(regions.iter().copied());
    writer
        .write_record(&header)
        .map_err(|e| AppError::runtime(format!("Failed to write export CSV header: {e}")))?;

    let lookup: Vec<HashMap<NaiveDate, Option<u8>>> = outcome
        .series
        .iter()
        .map(|s| s.points.iter().map(|p| (p.date, p.interest)).collect())
        .collect();

    for date in outcome.series.date_grid() {
        let mut record = Vec::with_capacity(regions.len() + 1);
        record.push(date.to_string());
        for by_date in &lookup {
            let cell = by_date
                .get(&date)
                .copied()
                .flatten()
                .map(|v| v.to_string())
                .unwrap_or_default();
            record.push(cell);
        }
        writer
            .write_record(&record)
            .map_err(|e| AppError::runtime(format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::runtime(format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

pub fn write_reviews_csv(path: &Path, rows: &[ReviewRow]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::runtime(format!("Failed to create reviews CSV '{}': {e}", path.display())))?;
    write_reviews(csv::Writer::from_writer(file), rows.iter())
}

fn write_reviews<'a, W: std::io::Write>(
    mut writer: csv::Writer<W>,
    rows: impl Iterator<Item = &'a ReviewRow>,
) -> Result<(), AppError> {
    writer
        .write_record(["location", "text", "rating", "timestamp", "author"])
        .map_err(|e| AppError::runtime(format!("Failed to write reviews CSV header: {e}")))?;

    for row in rows {
        writer
            .write_record([
                row.location.as_str(),
                row.text.as_str(),
                &row.rating.to_string(),
                &row.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                row.author.as_str(),
            ])
            .map_err(|e| AppError::runtime(format!("Failed to write reviews CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::runtime(format!("Failed to flush reviews CSV: {e}")))?;
    Ok(())
}

pub fn write_figures_csv(path: &Path, table: &FiguresTable) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::runtime(format!("Failed to create figures CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);

    let mut header = vec![table.label_header.as_str()];
    header.extend(table.columns.iter().map(String::as_str));
    writer
        .write_record(&header)
        .map_err(|e| AppError::runtime(format!("Failed to write figures CSV header: {e}")))?;

    for row in &table.rows {
        let mut record = vec![row.label.clone()];
        record.extend(row.values.iter().map(|v| v.map(|v| v.to_string()).unwrap_or_default()));
        writer
            .write_record(&record)
            .map_err(|e| AppError::runtime(format!("Failed to write figures CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::runtime(format!("Failed to flush figures CSV: {e}")))?;
    Ok(())
}
