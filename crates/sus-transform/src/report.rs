//! Grouped summary of join keys that did not match exactly.

use polars::prelude::*;
use serde::Serialize;

use crate::join::{MatchStage, NonExactMatch};

/// One distinct key that needed a fallback, with the date range it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmatchedKey {
    pub key: String,
    pub stage: MatchStage,
    pub count: u64,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
}

fn stage_from_str(value: &str) -> MatchStage {
    match value {
        "exact_short" => MatchStage::ExactShort,
        "exact_long" => MatchStage::ExactLong,
        "degraded" => MatchStage::Degraded,
        _ => MatchStage::Unmatched,
    }
}

/// Group non-exact matches by `(key, stage)` with the record count and the
/// earliest and latest associated date. Sorted by count, largest first, then
/// by key.
pub fn unmatched_key_summary(matches: &[NonExactMatch]) -> PolarsResult<Vec<UnmatchedKey>> {
    if matches.is_empty() {
        return Ok(Vec::new());
    }
    let keys: Vec<&str> = matches.iter().map(|m| m.key.as_str()).collect();
    let stages: Vec<&str> = matches.iter().map(|m| m.stage.as_str()).collect();
    let dates: Vec<Option<&str>> = matches.iter().map(|m| m.date.as_deref()).collect();

    let df = DataFrame::new(vec![
        Column::new("key".into(), keys),
        Column::new("stage".into(), stages),
        Column::new("date".into(), dates),
    ])?;
    let grouped = df
        .lazy()
        .group_by([col("key"), col("stage")])
        .agg([
            len().alias("count"),
            col("date").min().alias("first_date"),
            col("date").max().alias("last_date"),
        ])
        .collect()?;

    let keys = grouped.column("key")?.str()?;
    let stages = grouped.column("stage")?.str()?;
    let counts = grouped.column("count")?.cast(&DataType::UInt64)?;
    let counts = counts.u64()?;
    let first = grouped.column("first_date")?.str()?;
    let last = grouped.column("last_date")?.str()?;

    let mut summary: Vec<UnmatchedKey> = (0..grouped.height())
        .map(|idx| UnmatchedKey {
            key: keys.get(idx).unwrap_or_default().to_string(),
            stage: stage_from_str(stages.get(idx).unwrap_or_default()),
            count: counts.get(idx).unwrap_or(0),
            first_date: first.get(idx).map(str::to_string),
            last_date: last.get(idx).map(str::to_string),
        })
        .collect();
    summary.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    Ok(summary)
}
