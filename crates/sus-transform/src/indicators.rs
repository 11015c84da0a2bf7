//! Numeric `*field_` columns derived from record values.

use std::collections::BTreeSet;

use sus_model::{IndicatorPolicy, RecordTable, Result, field_name};
use tracing::debug;

pub const SET: &str = "1";

/// Name of the indicator field for one label of a column.
pub fn label_field_name(column: &str, label: &str) -> String {
    field_name(&format!("{column} - {label}"))
}

/// Add a field built from a row predicate: `1` where it holds, the policy's
/// unset value elsewhere. Returns the number of rows set.
pub fn add_indicator<F>(
    table: &mut RecordTable,
    field: &str,
    policy: IndicatorPolicy,
    mut predicate: F,
) -> Result<usize>
where
    F: FnMut(&[String]) -> bool,
{
    let values: Vec<String> = table
        .rows
        .iter()
        .map(|row| {
            if predicate(row) {
                SET.to_string()
            } else {
                policy.unset_value().to_string()
            }
        })
        .collect();
    let set = values.iter().filter(|value| *value == SET).count();
    table.set_column(field, values)?;
    Ok(set)
}

/// One field per label, `*field_{column} - {label}`.
///
/// Labels of one column are mutually exclusive, so at most one of these
/// fields is set on each row.
pub fn add_label_fields(
    table: &mut RecordTable,
    column: &str,
    labels: &[&str],
    policy: IndicatorPolicy,
) -> Result<Vec<String>> {
    let idx = table.require_column(column, "label fields")?;
    let mut fields = Vec::with_capacity(labels.len());
    for label in labels.iter().filter(|label| !label.is_empty()) {
        let field = label_field_name(column, label);
        add_indicator(table, &field, policy, |row| row[idx] == *label)?;
        fields.push(field);
    }
    debug!(column, fields = fields.len(), "label fields added");
    Ok(fields)
}

/// `*field_{column}` carrying the column's value unchanged.
pub fn add_passthrough_field(table: &mut RecordTable, column: &str) -> Result<String> {
    let idx = table.require_column(column, "passthrough fields")?;
    let values = table.column_values(idx).map(str::to_string).collect();
    let field = field_name(column);
    table.set_column(&field, values)?;
    Ok(field)
}

/// Indicators over the distinct values found in several columns.
///
/// Each distinct non-empty value `v` of any listed column produces the field
/// `*field_{id} - {v}`, set to `1` when at least one column of the row holds
/// `v`. Columns absent from the table are skipped. Every row is kept.
pub fn add_pivot_fields(
    table: &mut RecordTable,
    columns: &[String],
    id: &str,
    policy: IndicatorPolicy,
) -> Result<Vec<String>> {
    let indexes: Vec<usize> = columns
        .iter()
        .filter_map(|column| {
            let idx = table.column_index(column);
            if idx.is_none() {
                debug!(column = %column, "pivot column not present, skipping");
            }
            idx
        })
        .collect();
    let values: BTreeSet<String> = table
        .rows
        .iter()
        .flat_map(|row| indexes.iter().map(move |&idx| row[idx].as_str()))
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect();

    let mut fields = Vec::with_capacity(values.len());
    for value in &values {
        let field = label_field_name(id, value);
        add_indicator(table, &field, policy, |row| {
            indexes.iter().any(|&idx| row[idx] == *value)
        })?;
        fields.push(field);
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_fields_are_mutually_exclusive() {
        let mut table =
            RecordTable::from_literal(&["PARTO"], &[&["Vaginal"], &["Cesáreo"], &[""], &["7"]]);
        let fields = add_label_fields(
            &mut table,
            "PARTO",
            &["Vaginal", "Cesáreo", "Ignorado", ""],
            IndicatorPolicy::Zero,
        )
        .expect("fields");
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0], "*field_PARTO - Vaginal");

        let sums: Vec<u32> = (0..table.row_count())
            .map(|row| {
                fields
                    .iter()
                    .map(|field| {
                        let idx = table.column_index(field).unwrap();
                        table.value(row, idx).parse::<u32>().unwrap()
                    })
                    .sum()
            })
            .collect();
        assert_eq!(sums, vec![1, 1, 0, 0]);
    }

    #[test]
    fn missing_policy_leaves_unset_rows_empty() {
        let mut table = RecordTable::from_literal(&["A"], &[&["x"], &["y"]]);
        add_label_fields(&mut table, "A", &["x"], IndicatorPolicy::Missing).expect("fields");
        let idx = table.column_index("*field_A - x").unwrap();
        assert_eq!(table.value(0, idx), "1");
        assert_eq!(table.value(1, idx), "");
    }

    #[test]
    fn pivot_clips_repeated_values_and_keeps_rows() {
        let mut table = RecordTable::from_literal(
            &["c_0", "c_1"],
            &[&["A", "A"], &["A", "B"], &["", ""]],
        );
        let fields = add_pivot_fields(
            &mut table,
            &["c_0".to_string(), "c_1".to_string(), "c_2".to_string()],
            "cat",
            IndicatorPolicy::Zero,
        )
        .expect("pivot");
        assert_eq!(fields, vec!["*field_cat - A", "*field_cat - B"]);
        assert_eq!(table.row_count(), 3);
        let a = table.column_index("*field_cat - A").unwrap();
        let b = table.column_index("*field_cat - B").unwrap();
        assert_eq!(table.value(0, a), "1");
        assert_eq!(table.value(0, b), "0");
        assert_eq!(table.value(1, b), "1");
        assert_eq!(table.value(2, a), "0");
    }
}
