//! Reference joins.
//!
//! [`reference_join`] is row-preserving: every record comes out exactly once,
//! with the reference columns filled from the first key resolution that
//! succeeds. [`fan_out`] is the one-to-many variant.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use sus_model::{RecordTable, ReferenceTable, Result, SusError};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStage {
    ExactShort,
    ExactLong,
    Degraded,
    Unmatched,
}

impl MatchStage {
    pub fn is_exact(self) -> bool {
        matches!(self, Self::ExactShort | Self::ExactLong)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExactShort => "exact_short",
            Self::ExactLong => "exact_long",
            Self::Degraded => "degraded",
            Self::Unmatched => "unmatched",
        }
    }
}

impl std::fmt::Display for MatchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn match_short<'a>(key: &str, reference: &'a ReferenceTable) -> Option<&'a [String]> {
    reference.get_short(key)
}

pub fn match_long<'a>(key: &str, reference: &'a ReferenceTable) -> Option<&'a [String]> {
    reference.get_long(key)
}

/// Municipality codes with a known replacement: `(prefix, code)`.
pub const PREFIX_REWRITES: &[(&str, &str)] = &[("53", "530010")];

/// Rewrite a key whose prefix has a fixed replacement code.
pub fn rewrite_prefix(key: &str) -> Option<String> {
    PREFIX_REWRITES
        .iter()
        .find(|(prefix, _)| key.starts_with(prefix))
        .map(|(_, code)| (*code).to_string())
}

/// First two characters followed by `0000`.
pub fn truncate_key(key: &str) -> Option<String> {
    key.get(..2).map(|head| format!("{head}0000"))
}

/// Ordered degraded-key rules tried after both exact matches fail.
#[derive(Debug, Clone)]
pub struct KeyResolver {
    rules: Vec<fn(&str) -> Option<String>>,
}

impl KeyResolver {
    pub fn new(rules: Vec<fn(&str) -> Option<String>>) -> Self {
        Self { rules }
    }

    /// Prefix rewrites, then truncation.
    pub fn standard() -> Self {
        Self::new(vec![rewrite_prefix, truncate_key])
    }

    /// Exact lookups only.
    pub fn exact() -> Self {
        Self::new(Vec::new())
    }

    pub fn resolve<'a>(
        &self,
        key: &str,
        reference: &'a ReferenceTable,
    ) -> (MatchStage, Option<&'a [String]>) {
        if let Some(row) = match_short(key, reference) {
            return (MatchStage::ExactShort, Some(row));
        }
        if let Some(row) = match_long(key, reference) {
            return (MatchStage::ExactLong, Some(row));
        }
        for rule in &self.rules {
            if let Some(row) = rule(key).and_then(|degraded| reference.get(&degraded)) {
                return (MatchStage::Degraded, Some(row));
            }
        }
        (MatchStage::Unmatched, None)
    }
}

/// What to write into the output columns of an unmatched record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmatchedFill {
    /// Empty reference columns.
    #[default]
    Empty,
    /// Leave whatever the record already had.
    Keep,
}

/// One record that did not match exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NonExactMatch {
    pub key: String,
    pub stage: MatchStage,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JoinReport {
    pub rows: usize,
    pub exact: usize,
    pub degraded: usize,
    pub unmatched: usize,
    pub empty_keys: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub non_exact: Vec<NonExactMatch>,
}

/// Fill `outputs` (one per reference column, same order) from the reference
/// row each record's key resolves to.
///
/// Empty keys are not looked up and count as unmatched. When `date_column`
/// is given its value is recorded with every non-exact match.
pub fn reference_join(
    table: &mut RecordTable,
    key_column: &str,
    reference: &ReferenceTable,
    resolver: &KeyResolver,
    outputs: &[String],
    date_column: Option<&str>,
    fill: UnmatchedFill,
) -> Result<JoinReport> {
    if outputs.len() != reference.columns().len() {
        return Err(SusError::Message(format!(
            "reference join on {key_column}: {} output columns for {} reference columns",
            outputs.len(),
            reference.columns().len()
        )));
    }
    let key_idx = table.require_column(key_column, "reference join")?;
    let date_idx = date_column
        .map(|column| table.require_column(column, "reference join"))
        .transpose()?;
    let output_idx: Vec<usize> = outputs.iter().map(|name| table.ensure_column(name)).collect();

    let mut report = JoinReport {
        rows: table.row_count(),
        ..JoinReport::default()
    };
    for row in &mut table.rows {
        let key = row[key_idx].trim().to_string();
        let (stage, values) = if key.is_empty() {
            report.empty_keys += 1;
            (MatchStage::Unmatched, None)
        } else {
            resolver.resolve(&key, reference)
        };
        match values {
            Some(values) => {
                for (&idx, value) in output_idx.iter().zip(values) {
                    row[idx] = value.clone();
                }
            }
            None if fill == UnmatchedFill::Empty => {
                for &idx in &output_idx {
                    row[idx].clear();
                }
            }
            None => {}
        }
        match stage {
            MatchStage::ExactShort | MatchStage::ExactLong => report.exact += 1,
            MatchStage::Degraded => report.degraded += 1,
            MatchStage::Unmatched => report.unmatched += 1,
        }
        if !stage.is_exact() && !key.is_empty() {
            report.non_exact.push(NonExactMatch {
                key,
                stage,
                date: date_idx
                    .map(|idx| row[idx].clone())
                    .filter(|date| !date.is_empty()),
            });
        }
    }
    SusError::ensure_row_count(
        &format!("reference join on {key_column}"),
        report.rows,
        table.row_count(),
    )?;

    if report.unmatched > 0 {
        warn!(
            column = key_column,
            unmatched = report.unmatched,
            empty_keys = report.empty_keys,
            "records without a reference match"
        );
    }
    info!(
        column = key_column,
        rows = report.rows,
        exact = report.exact,
        degraded = report.degraded,
        "reference join complete"
    );
    Ok(report)
}

/// Composite key of several values joined by `__`.
pub fn composite_key<'a, I>(values: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    values.into_iter().collect::<Vec<_>>().join("__")
}

/// Composite key -> distinct value rows to emit for it.
#[derive(Debug, Clone, Default)]
pub struct FanOutIndex {
    key_columns: Vec<String>,
    value_columns: Vec<String>,
    entries: BTreeMap<String, BTreeSet<Vec<String>>>,
}

impl FanOutIndex {
    pub fn new(key_columns: Vec<String>, value_columns: Vec<String>) -> Self {
        Self {
            key_columns,
            value_columns,
            entries: BTreeMap::new(),
        }
    }

    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    pub fn value_columns(&self) -> &[String] {
        &self.value_columns
    }

    /// Record a value row for a key; repeated rows are stored once.
    pub fn insert(&mut self, key: String, values: Vec<String>) {
        self.entries.entry(key).or_default().insert(values);
    }

    pub fn matches(&self, key: &str) -> usize {
        self.entries.get(key).map_or(0, BTreeSet::len)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Emit each record once per value row its composite key maps to, with the
/// value columns overwritten. Records without a match are not emitted.
pub fn fan_out(table: &RecordTable, index: &FanOutIndex) -> Result<RecordTable> {
    let key_idx = index
        .key_columns
        .iter()
        .map(|column| table.require_column(column, "fan-out"))
        .collect::<Result<Vec<_>>>()?;
    let mut output = table.clone();
    output.rows.clear();
    let value_idx: Vec<usize> = index
        .value_columns
        .iter()
        .map(|column| output.ensure_column(column))
        .collect();

    let mut expected = 0usize;
    for row in &table.rows {
        let key = composite_key(key_idx.iter().map(|&idx| row[idx].as_str()));
        let Some(value_rows) = index.entries.get(&key) else {
            continue;
        };
        expected += value_rows.len();
        for values in value_rows {
            let mut emitted = row.clone();
            emitted.resize(output.column_count(), String::new());
            for (&idx, value) in value_idx.iter().zip(values) {
                emitted[idx] = value.clone();
            }
            output.rows.push(emitted);
        }
    }
    SusError::ensure_row_count("fan-out", expected, output.row_count())?;
    info!(
        input = table.row_count(),
        output = output.row_count(),
        "fan-out join complete"
    );
    Ok(output)
}
