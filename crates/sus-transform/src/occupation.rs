//! Occupation codes joined onto records.

use std::collections::BTreeSet;

use serde::Serialize;
use sus_model::codes::occupation;
use sus_model::{Dimension, RecordTable, ReferenceTable, Result, SusError};
use tracing::info;

/// Output dimensions for the deceased's occupation, in lookup column order.
pub const OCCUPATION_DIMENSIONS: [Dimension; 5] = [
    Dimension::OccupationTitle,
    Dimension::OccupationFamily,
    Dimension::OccupationSubgroup,
    Dimension::OccupationPrincipalSubgroup,
    Dimension::OccupationGroup,
];

/// Output dimensions for the mother's occupation, in lookup column order.
pub const MOTHERS_OCCUPATION_DIMENSIONS: [Dimension; 5] = [
    Dimension::MothersOccupationTitle,
    Dimension::MothersOccupationFamily,
    Dimension::MothersOccupationSubgroup,
    Dimension::MothersOccupationPrincipalSubgroup,
    Dimension::MothersOccupationGroup,
];

const FULL_CODE_LEN: usize = 5;
const SHORT_CODE_LEN: usize = 3;

/// Code used for the lookup: non-numeric codes are dropped and unknown
/// 5-digit codes fall back to their first three digits.
pub fn lookup_code(raw: &str, lookup: &ReferenceTable) -> String {
    let code = raw.trim();
    if code.is_empty() || !code.bytes().all(|b| b.is_ascii_digit()) {
        return String::new();
    }
    if code.len() == FULL_CODE_LEN && !lookup.contains(code) {
        return code[..SHORT_CODE_LEN].to_string();
    }
    code.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OccupationReport {
    pub matched: usize,
    pub unknown: usize,
    pub unknown_codes: Vec<String>,
}

/// Replace `column` with the occupation dimensions. Codes that still do not
/// match get [`occupation::UNKNOWN_OCCUPATION`] in every dimension.
pub fn join_occupation(
    table: &mut RecordTable,
    column: &str,
    dimensions: &[Dimension; 5],
    lookup: &ReferenceTable,
) -> Result<OccupationReport> {
    let input_idx = table.require_column(column, "occupation")?;
    let lookup_idx = occupation::VALUE_COLUMNS
        .iter()
        .map(|name| {
            lookup
                .column_index(name)
                .ok_or_else(|| SusError::missing_column("occupation lookup", *name))
        })
        .collect::<Result<Vec<_>>>()?;
    let outputs: Vec<usize> = dimensions
        .iter()
        .map(|dimension| table.ensure_column(dimension.as_str()))
        .collect();

    let mut report = OccupationReport::default();
    let mut unknown = BTreeSet::new();
    for row in &mut table.rows {
        let code = lookup_code(&row[input_idx], lookup);
        if code.is_empty() {
            for &target in &outputs {
                row[target].clear();
            }
            continue;
        }
        match lookup.get(&code) {
            Some(values) => {
                report.matched += 1;
                for (&target, &source) in outputs.iter().zip(&lookup_idx) {
                    row[target] = values[source].clone();
                }
            }
            None => {
                report.unknown += 1;
                for &target in &outputs {
                    row[target] = occupation::UNKNOWN_OCCUPATION.to_string();
                }
                unknown.insert(code);
            }
        }
    }
    table.drop_columns(&[column]);

    report.unknown_codes = unknown.into_iter().collect();
    info!(
        column,
        matched = report.matched,
        unknown = report.unknown,
        codes = ?report.unknown_codes,
        "occupation codes joined"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup() -> ReferenceTable {
        let mut builder = ReferenceTable::builder(occupation::VALUE_COLUMNS);
        builder
            .insert(
                "225125",
                "",
                vec![
                    "Médico clínico".into(),
                    "2251: Médicos clínicos".into(),
                    "225: Profissionais da medicina".into(),
                    "22: Profissionais das ciências biológicas".into(),
                    "2: Profissionais das ciências e das artes".into(),
                ],
            )
            .expect("insert");
        builder
            .insert("999", "", vec!["Aposentado".into()])
            .expect("insert");
        builder.build()
    }

    #[test]
    fn codes_are_cleaned_before_lookup() {
        let lookup = lookup();
        assert_eq!(lookup_code("99912", &lookup), "999");
        assert_eq!(lookup_code("2251-25", &lookup), "");
        assert_eq!(lookup_code("225125", &lookup), "225125");
    }

    #[test]
    fn unknown_codes_are_labelled() {
        let mut table =
            RecordTable::from_literal(&["OCUP"], &[&["225125"], &["99912"], &["12345"], &[""]]);
        let report =
            join_occupation(&mut table, "OCUP", &OCCUPATION_DIMENSIONS, &lookup()).expect("join");
        assert!(!table.has_column("OCUP"));
        assert_eq!(report.matched, 2);
        assert_eq!(report.unknown_codes, vec!["123"]);

        let title = table.column_index("OccupationTitle").unwrap();
        let group = table.column_index("OccupationGroup").unwrap();
        assert_eq!(table.value(0, title), "Médico clínico");
        assert_eq!(table.value(1, title), "Aposentado");
        assert_eq!(table.value(2, group), occupation::UNKNOWN_OCCUPATION);
        assert_eq!(table.value(3, title), "");
    }
}
