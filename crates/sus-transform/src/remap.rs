//! Coded value -> display label remapping.
//!
//! Each column has a closed dictionary. A value already equal to one of the
//! dictionary's labels is kept as is, so running the remap twice changes
//! nothing on the second pass.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use sus_model::{RecordTable, RemapMode, Result, SusError};
use tracing::{debug, warn};

/// Closed `{raw code -> label}` dictionary for one column.
///
/// An explicit `""` entry gives "no response" a label. Without one, empty
/// values are left empty and are not counted as unmapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueMap {
    pub column: String,
    entries: BTreeMap<String, String>,
}

impl ValueMap {
    pub fn new<I, K, V>(column: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            column: column.into(),
            entries: entries
                .into_iter()
                .map(|(code, label)| (code.into(), label.into()))
                .collect(),
        }
    }

    /// Same dictionary applied to another column.
    pub fn for_column(&self, column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            entries: self.entries.clone(),
        }
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.entries.get(code).map(String::as_str)
    }

    pub fn is_label(&self, value: &str) -> bool {
        self.entries.values().any(|label| label == value)
    }

    /// Distinct non-empty labels, in code order.
    pub fn labels(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.entries
            .values()
            .map(String::as_str)
            .filter(|label| !label.is_empty() && seen.insert(*label))
            .collect()
    }

    /// Label for `value`, `None` when the value is outside the dictionary.
    pub fn resolve<'a>(&'a self, value: &'a str) -> Option<&'a str> {
        if let Some(label) = self.get(value) {
            return Some(label);
        }
        if value.is_empty() || self.is_label(value) {
            return Some(value);
        }
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemapReport {
    /// Column -> number of values left unmapped.
    pub unmapped: BTreeMap<String, usize>,
}

impl RemapReport {
    pub fn total_unmapped(&self) -> usize {
        self.unmapped.values().sum()
    }
}

/// Apply each dictionary to its column in place.
///
/// In strict mode the first column holding codes outside its dictionary
/// fails with [`SusError::UnmappedCodes`] before anything is rewritten.
/// In lenient mode such values are kept unchanged and counted.
pub fn remap_columns(
    table: &mut RecordTable,
    maps: &[ValueMap],
    mode: RemapMode,
) -> Result<RemapReport> {
    let mut report = RemapReport::default();
    for map in maps {
        let idx = table.require_column(&map.column, "remap")?;
        let mut count = 0usize;
        let mut distinct = BTreeSet::new();
        for value in table.column_values(idx) {
            if map.resolve(value).is_none() {
                count += 1;
                distinct.insert(value.to_string());
            }
        }
        if count > 0 {
            let values: Vec<String> = distinct.into_iter().collect();
            if mode == RemapMode::Strict {
                return Err(SusError::UnmappedCodes {
                    column: map.column.clone(),
                    count,
                    values,
                });
            }
            warn!(column = %map.column, unmapped = count, values = ?values, "values without a label");
            report.unmapped.insert(map.column.clone(), count);
        }

        for row in &mut table.rows {
            if let Some(label) = map.resolve(&row[idx]).map(str::to_string) {
                row[idx] = label;
            }
        }
        debug!(column = %map.column, "column remapped");
    }
    Ok(report)
}
