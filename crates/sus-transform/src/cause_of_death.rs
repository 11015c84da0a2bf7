//! Cause-of-death codes joined onto records.
//!
//! A record's cause column may hold several CID codes separated by `*`.
//! Each code gets its own slot `i`, and the lookup columns are appended as
//! `{dimension}_{i}`.

use serde::Serialize;
use sus_model::codes::cause_of_death;
use sus_model::{Dimension, RecordTable, ReferenceTable, Result, SusError};
use tracing::{info, warn};

/// Dimensions filled from the lookup, in lookup column order.
pub const CAUSE_DIMENSIONS: [Dimension; 6] = [
    Dimension::CausesTitle,
    Dimension::CausesParent,
    Dimension::CausesCategory1,
    Dimension::CausesCategory2,
    Dimension::CausesCategory3,
    Dimension::CausesCategory4,
];

/// Characters kept when falling back to the parent code.
const PARENT_CODE_LEN: usize = 3;

pub fn slot_column(dimension: Dimension, slot: usize) -> String {
    format!("{dimension}_{slot}")
}

/// Category-1 columns of every slot.
pub fn category1_columns(max_codes: usize) -> Vec<String> {
    (0..max_codes)
        .map(|slot| slot_column(Dimension::CausesCategory1, slot))
        .collect()
}

/// `*A00.0*B01` -> `["A000", "B01"]`: drop the leading `*` and the dots,
/// uppercase, split on the remaining `*`.
pub fn split_codes(raw: &str) -> Vec<String> {
    let cleaned = raw.replacen('*', "", 1).replace('.', "").to_uppercase();
    if cleaned.trim().is_empty() {
        return Vec::new();
    }
    cleaned
        .split('*')
        .map(|code| code.trim().to_string())
        .collect()
}

fn parent_code(code: &str) -> String {
    code.chars().take(PARENT_CODE_LEN).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CauseOfDeathReport {
    pub codes: usize,
    /// Codes matched through their first three characters.
    pub parent_fallbacks: usize,
    pub unmatched: usize,
    /// Codes beyond the last slot, not joined.
    pub truncated: usize,
}

/// Replace `column` with the lookup columns of up to `max_codes` codes.
pub fn join_causes_of_death(
    table: &mut RecordTable,
    column: &str,
    max_codes: usize,
    lookup: &ReferenceTable,
) -> Result<CauseOfDeathReport> {
    let input_idx = table.require_column(column, "cause of death")?;
    let lookup_idx = cause_of_death::VALUE_COLUMNS
        .iter()
        .map(|name| {
            lookup
                .column_index(name)
                .ok_or_else(|| SusError::missing_column("cause of death lookup", *name))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut outputs: Vec<Vec<usize>> = Vec::with_capacity(max_codes);
    for slot in 0..max_codes {
        outputs.push(
            CAUSE_DIMENSIONS
                .iter()
                .map(|dimension| table.ensure_column(&slot_column(*dimension, slot)))
                .collect(),
        );
    }

    let mut report = CauseOfDeathReport::default();
    let mut unmatched_codes = std::collections::BTreeSet::new();
    for row in &mut table.rows {
        let codes = split_codes(&row[input_idx]);
        if codes.len() > max_codes {
            report.truncated += codes.len() - max_codes;
        }
        for (slot, columns) in outputs.iter().enumerate() {
            let code = codes.get(slot).map(String::as_str).unwrap_or("");
            let values = if code.is_empty() {
                None
            } else {
                report.codes += 1;
                lookup.get_short(code).or_else(|| {
                    let parent = lookup.get_short(&parent_code(code));
                    if parent.is_some() {
                        report.parent_fallbacks += 1;
                    }
                    parent
                })
            };
            match values {
                Some(values) => {
                    for (&target, &source) in columns.iter().zip(&lookup_idx) {
                        row[target] = values[source].clone();
                    }
                }
                None => {
                    if !code.is_empty() {
                        report.unmatched += 1;
                        unmatched_codes.insert(code.to_string());
                    }
                    for &target in columns {
                        row[target].clear();
                    }
                }
            }
        }
    }
    table.drop_columns(&[column]);

    if report.truncated > 0 {
        warn!(column, truncated = report.truncated, max_codes, "codes beyond the last slot");
    }
    if report.unmatched > 0 {
        info!(
            column,
            unmatched = report.unmatched,
            codes = ?unmatched_codes,
            "cause of death codes without a lookup entry"
        );
    }
    info!(
        column,
        codes = report.codes,
        parent_fallbacks = report.parent_fallbacks,
        "cause of death joined"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup() -> ReferenceTable {
        let mut builder = ReferenceTable::builder(cause_of_death::VALUE_COLUMNS);
        builder
            .insert(
                "A000",
                "",
                vec![
                    "A00.0: Cólera clássica".into(),
                    "A00: Cólera".into(),
                    "A00-B99: Algumas doenças infecciosas e parasitárias".into(),
                    "A00-A09: Doenças infecciosas intestinais".into(),
                ],
            )
            .expect("insert");
        builder
            .insert(
                "I21",
                "",
                vec![
                    "".into(),
                    "I21: Infarto agudo do miocárdio".into(),
                    "I00-I99: Doenças do aparelho circulatório".into(),
                ],
            )
            .expect("insert");
        builder.build()
    }

    #[test]
    fn codes_are_cleaned_and_split() {
        assert_eq!(split_codes("*A00.0*I21.9"), vec!["A000", "I219"]);
        assert_eq!(split_codes("a000"), vec!["A000"]);
        assert!(split_codes("").is_empty());
    }

    #[test]
    fn slots_fill_and_fall_back_to_parent() {
        let mut table = RecordTable::from_literal(
            &["CAUSABAS"],
            &[&["*A00.0"], &["I21.9"], &["Z999"], &[""]],
        );
        let report = join_causes_of_death(&mut table, "CAUSABAS", 1, &lookup()).expect("join");
        assert!(!table.has_column("CAUSABAS"));
        assert_eq!(report.codes, 3);
        assert_eq!(report.parent_fallbacks, 1);
        assert_eq!(report.unmatched, 1);

        let title = table.column_index("CausesOfDeathTitle_0").unwrap();
        let category = table.column_index("CausesOfDeathCategory1_0").unwrap();
        assert_eq!(table.value(0, title), "A00.0: Cólera clássica");
        assert_eq!(table.value(1, category), "I00-I99: Doenças do aparelho circulatório");
        assert_eq!(table.value(2, category), "");
        assert_eq!(table.row_count(), 4);
    }

    #[test]
    fn extra_codes_are_counted() {
        let mut table = RecordTable::from_literal(&["LINHAA"], &[&["*A000*I21*I21"]]);
        let report = join_causes_of_death(&mut table, "LINHAA", 2, &lookup()).expect("join");
        assert_eq!(report.truncated, 1);
        assert!(table.has_column("CausesOfDeathParent_1"));
    }
}
