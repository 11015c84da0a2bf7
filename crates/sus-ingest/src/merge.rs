use sus_model::RecordTable;
use tracing::info;

/// Concatenate tables given in preference order.
///
/// The output columns are those of the first table, followed by columns that
/// only later tables carry, in the order they are first seen. Cells a table
/// has no column for are left empty. Rows keep the preference order too.
pub fn merge_tables<I>(tables: I) -> RecordTable
where
    I: IntoIterator<Item = RecordTable>,
{
    let mut merged = RecordTable::default();
    for table in tables {
        info!(rows = table.row_count(), columns = table.column_count(), "merging table");
        merged.append(table);
    }
    merged
}
