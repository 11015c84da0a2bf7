//! Location dimension files produced before canonical matching.
//!
//! Some sources store a municipality code in the municipality column. Those
//! files are patched from the municipality reference, and the canonical
//! matches are then fanned back out to every raw value that produced them.

use sus_model::{Dimension, HIERARCHICAL_DIMENSIONS, RecordTable, ReferenceTable, Result};

use crate::join::{
    FanOutIndex, JoinReport, KeyResolver, UnmatchedFill, composite_key, fan_out, reference_join,
};

fn clean_columns() -> Vec<String> {
    HIERARCHICAL_DIMENSIONS
        .iter()
        .map(|dimension| dimension.clean_column())
        .collect()
}

/// Overwrite the clean hierarchy columns of every row whose clean
/// municipality value is a known municipality code. Other rows are left
/// untouched.
pub fn patch_locations(
    table: &mut RecordTable,
    reference: &ReferenceTable,
    resolver: &KeyResolver,
) -> Result<JoinReport> {
    let key_column = Dimension::Municipality.clean_column();
    reference_join(
        table,
        &key_column,
        reference,
        resolver,
        &clean_columns(),
        None,
        UnmatchedFill::Keep,
    )
}

/// Emit each canonical match once per distinct raw hierarchy that mapped to
/// it, with the clean columns replaced by those raw values.
pub fn fan_out_locations(unmatched: &RecordTable, matched: &RecordTable) -> Result<RecordTable> {
    let clean = clean_columns();
    let clean_idx = clean
        .iter()
        .map(|column| unmatched.require_column(column, "unmatched locations"))
        .collect::<Result<Vec<_>>>()?;
    let raw_idx = HIERARCHICAL_DIMENSIONS
        .iter()
        .map(|dimension| unmatched.require_column(&dimension.raw_column(), "unmatched locations"))
        .collect::<Result<Vec<_>>>()?;

    let mut index = FanOutIndex::new(clean.clone(), clean);
    for row in &unmatched.rows {
        let key = composite_key(clean_idx.iter().map(|&idx| row[idx].as_str()));
        let values = raw_idx.iter().map(|&idx| row[idx].clone()).collect();
        index.insert(key, values);
    }
    fan_out(matched, &index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> ReferenceTable {
        let mut builder = ReferenceTable::builder(
            HIERARCHICAL_DIMENSIONS.iter().map(|dimension| dimension.as_str()),
        );
        builder
            .insert(
                "310620",
                "3106200",
                vec![
                    "Sudeste".into(),
                    "Minas Gerais".into(),
                    "Belo Horizonte".into(),
                    "Belo Horizonte".into(),
                ],
            )
            .expect("insert");
        builder.build()
    }

    #[test]
    fn patch_rewrites_known_codes_only() {
        let mut table = RecordTable::from_literal(
            &[
                "CleanRegionName",
                "CleanStateName",
                "CleanHealthRegionName",
                "CleanMunicipalityName",
                "RawMunicipalityName",
            ],
            &[
                &["", "MG", "", "3106200", "3106200"],
                &["", "SP", "", "São Paulo", "São Paulo"],
            ],
        );
        let report =
            patch_locations(&mut table, &reference(), &KeyResolver::exact()).expect("patch");
        assert_eq!(report.exact, 1);
        assert_eq!(report.unmatched, 1);
        assert_eq!(
            table.rows[0][..4],
            ["Sudeste", "Minas Gerais", "Belo Horizonte", "Belo Horizonte"]
        );
        assert_eq!(table.rows[1][1], "SP");
        assert_eq!(table.rows[1][3], "São Paulo");
    }
}
