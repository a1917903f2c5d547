//! Financial figures spreadsheet (CSV) loader.
//!
//! The first column labels the row (month, store, line item); every other
//! column is coerced to a number. Spreadsheets exported from German locales
//! use decimal commas and currency suffixes, so cells like `1.234,50 €` are
//! accepted.

use std::fs::File;
use std::path::Path;

use log::debug;

use crate::domain::{FigureRow, FiguresTable};
use crate::error::AppError;

pub fn load_figures(path: &Path) -> Result<FiguresTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::usage(format!("Failed to open figures CSV '{}': {e}", path.display())))?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::usage(format!("Failed to read figures CSV headers: {e}")))?
        .clone();
    if headers.len() < 2 {
        return Err(AppError::usage(
            "Figures CSV needs a label column and at least one value column.",
        ));
    }

    let label_header = headers
        .get(0)
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .unwrap_or_default();
    let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| AppError::usage(format!("Figures CSV line {}: {e}", idx + 2)))?;
        let label = record.get(0).unwrap_or("").to_string();
        if label.is_empty() && record.iter().skip(1).all(str::is_empty) {
            continue;
        }
        let values = (1..headers.len())
            .map(|col| record.get(col).and_then(coerce_number))
            .collect();
        rows.push(FigureRow { label, values });
    }

    if rows.is_empty() {
        return Err(AppError::no_data(format!("No rows in figures CSV '{}'.", path.display())));
    }
    debug!(
        "loaded figures '{}' ({} rows x {} columns)",
        label_header,
        rows.len(),
        columns.len()
    );

    Ok(FiguresTable {
        label_header,
        columns,
        rows,
    })
}

/// Parse a spreadsheet cell into a number, tolerating currency/percent signs,
/// thousands separators and decimal commas. `-` and empty cells are `None`.
pub fn coerce_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '€' | '$' | '%' | ' ' | '\u{a0}' | '\''))
        .collect();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }

    let has_comma = cleaned.contains(',');
    let has_dot = cleaned.contains('.');
    let normalized = match (has_comma, has_dot) {
        (true, true) => {
            // Whichever separator comes last is the decimal mark.
            let last_comma = cleaned.rfind(',').unwrap_or(0);
            let last_dot = cleaned.rfind('.').unwrap_or(0);
            if last_comma > last_dot {
                cleaned.replace('.', "").replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (true, false) => cleaned.replace(',', "."),
        // `1.234.567` can only be grouping.
        (false, true) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        _ => cleaned,
    };

    let v = normalized.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn coerces_localized_numbers() {
        assert_eq!(coerce_number("1.234,50 €"), Some(1234.5));
        assert_eq!(coerce_number("$1,234.50"), Some(1234.5));
        assert_eq!(coerce_number("12,5%"), Some(12.5));
        assert_eq!(coerce_number("-42"), Some(-42.0));
        assert_eq!(coerce_number("1.234.567"), Some(1234567.0));
        assert_eq!(coerce_number("-"), None);
        assert_eq!(coerce_number(""), None);
        assert_eq!(coerce_number("n/a"), None);
    }

    #[test]
    fn loads_labelled_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Monat,Umsatz,Kosten\nJan,\"12.000,00 €\",\"8.500,00 €\"\nFeb,13000,-\n,,\n").unwrap();

        let table = load_figures(file.path()).unwrap();

        assert_eq!(table.label_header, "Monat");
        assert_eq!(table.columns, vec!["Umsatz".to_string(), "Kosten".to_string()]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].values, vec![Some(12000.0), Some(8500.0)]);
        assert_eq!(table.rows[1].values, vec![Some(13000.0), None]);
    }

    #[test]
    fn single_column_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "label\nA\n").unwrap();
        assert_eq!(load_figures(file.path()).unwrap_err().exit_code(), 2);
    }
}
