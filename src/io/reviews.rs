//! Reviews CSV ingest and validation.
//!
//! Turns a reviews export (as written by `tb reviews collect`, or a hand-made
//! spreadsheet) into validated `ReviewRow`s.
//!
//! - **Strict schema** for required columns (exit code 2)
//! - **Row-level validation**: bad rows are skipped and reported
//! - headers are matched case-insensitively, a UTF-8 BOM is ignored

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;

use crate::domain::{DEFAULT_AUTHOR, ReviewRow};
use crate::error::AppError;

const REQUIRED_COLUMNS: [&str; 4] = ["location", "text", "rating", "timestamp"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct LoadedReviews {
    pub rows: Vec<ReviewRow>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl LoadedReviews {
    /// Distinct locations in first-seen order.
    pub fn locations(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for row in &self.rows {
            if !out.contains(&row.location) {
                out.push(row.location.clone());
            }
        }
        out
    }
}

pub fn load_reviews(path: &Path) -> Result<LoadedReviews, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::usage(format!("Failed to open reviews CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::usage(format!("Failed to read reviews CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    for column in REQUIRED_COLUMNS {
        if !header_map.contains_key(column) {
            return Err(AppError::usage(format!("Missing required column: `{column}`")));
        }
    }

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header line; CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map) {
            Ok(row) => rows.push(row),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if rows.is_empty() {
        return Err(AppError::no_data(format!(
            "No valid reviews in '{}' ({} row(s) read, {} rejected).",
            path.display(),
            rows_read,
            row_errors.len()
        )));
    }

    Ok(LoadedReviews {
        rows,
        row_errors,
        rows_read,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_lowercase()
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<ReviewRow, String> {
    let location = get_required(record, header_map, "location")?.to_string();
    let text = get_optional(record, header_map, "text").unwrap_or("").to_string();
    let rating = parse_rating(get_required(record, header_map, "rating")?)?;
    let timestamp = parse_timestamp(get_required(record, header_map, "timestamp")?)?;
    let author = get_optional(record, header_map, "author")
        .unwrap_or(DEFAULT_AUTHOR)
        .to_string();

    Ok(ReviewRow {
        location,
        text,
        rating,
        timestamp,
        author,
    })
}

fn parse_rating(s: &str) -> Result<u8, String> {
    let v: f64 = s
        .parse()
        .map_err(|_| format!("Invalid rating '{s}'. Expected a whole number 1-5."))?;
    if v.fract() != 0.0 || !(1.0..=5.0).contains(&v) {
        return Err(format!("Invalid rating '{s}'. Expected a whole number 1-5."));
    }
    Ok(v as u8)
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, String> {
    const FMTS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
    for fmt in FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d.and_time(chrono::NaiveTime::MIN));
    }
    Err(format!(
        "Invalid timestamp '{s}'. Expected YYYY-MM-DD HH:MM:SS, RFC 3339, or YYYY-MM-DD."
    ))
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_valid_rows_and_reports_bad_ones() {
        let file = write_csv(concat!(
            "\u{feff}Location,text,rating,timestamp,author\n",
            "Kaspar Schmauser Fürth,Super,5,2024-05-01 12:30:00,Anna\n",
            "Kaspar Schmauser Fürth,Meh,7,2024-05-02 12:30:00,Ben\n",
            "Kaspar Schmauser Berlin,\"Gut, aber laut\",4.0,2024-05-03,\n",
            "Kaspar Schmauser Berlin,Hm,3,yesterday,Cem\n",
        ));

        let loaded = load_reviews(file.path()).unwrap();

        assert_eq!(loaded.rows_read, 4);
        assert_eq!(loaded.rows.len(), 2);
        assert_eq!(loaded.rows[1].text, "Gut, aber laut");
        assert_eq!(loaded.rows[1].rating, 4);
        assert_eq!(loaded.rows[1].author, DEFAULT_AUTHOR);
        assert_eq!(loaded.rows[1].timestamp.to_string(), "2024-05-03 00:00:00");

        let lines: Vec<usize> = loaded.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 5]);
        assert_eq!(
            loaded.locations(),
            vec!["Kaspar Schmauser Fürth".to_string(), "Kaspar Schmauser Berlin".to_string()]
        );
    }

    #[test]
    fn missing_column_is_a_usage_error() {
        let file = write_csv("location,text,timestamp\nA,b,2024-01-01\n");
        let err = load_reviews(file.path()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("rating"));
    }

    #[test]
    fn no_valid_rows_is_a_no_data_error() {
        let file = write_csv("location,text,rating,timestamp\nA,b,0,2024-01-01\n");
        assert_eq!(load_reviews(file.path()).unwrap_err().exit_code(), 3);
    }

    #[test]
    fn timestamps_accept_common_shapes() {
        assert!(parse_timestamp("2024-02-03 04:05:06").is_ok());
        assert!(parse_timestamp("2024-02-03T04:05:06").is_ok());
        assert_eq!(
            parse_timestamp("2024-02-03T04:05:06+01:00").unwrap().to_string(),
            "2024-02-03 03:05:06"
        );
    }
}
