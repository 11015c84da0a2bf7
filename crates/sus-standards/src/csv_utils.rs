//! Shared CSV utilities for loading classification and reference files.

use std::collections::BTreeMap;
use std::path::Path;

use csv::ReaderBuilder;

use crate::error::{Result, StandardsError};

/// Read a CSV file into a vector of row maps.
///
/// Each row is represented as a BTreeMap with column headers as keys.
/// Handles BOM characters and trims whitespace from values. Fails when one of
/// `required` is not a header.
pub fn read_csv_rows(
    path: &Path,
    delimiter: u8,
    required: &[&str],
) -> Result<Vec<BTreeMap<String, String>>> {
    let csv_error = |source| StandardsError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|header| header.trim().trim_matches('\u{feff}').to_string())
        .collect();
    if let Some(column) = required
        .iter()
        .find(|column| !headers.iter().any(|header| header == *column))
    {
        return Err(StandardsError::MissingColumn {
            path: path.to_path_buf(),
            column: (*column).to_string(),
        });
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let mut row = BTreeMap::new();
        for (idx, key) in headers.iter().enumerate() {
            let value = record.get(idx).unwrap_or("").trim().to_string();
            row.insert(key.clone(), value);
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Get a field value from a row, returning empty string if not present.
pub fn get_field<'a>(row: &'a BTreeMap<String, String>, key: &str) -> &'a str {
    row.get(key).map(String::as_str).unwrap_or("")
}

/// Get an optional field value from a row (None if empty or missing).
pub fn get_optional<'a>(row: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    row.get(key).map(String::as_str).filter(|v| !v.is_empty())
}
