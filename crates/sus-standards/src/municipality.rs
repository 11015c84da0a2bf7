//! Municipality reference: short/long IBGE code -> geographic hierarchy.

use std::path::Path;

use sus_model::codes::municipality;
use sus_model::{HIERARCHICAL_DIMENSIONS, ReferenceTable};
use tracing::{info, warn};

use crate::csv_utils::{get_field, read_csv_rows};
use crate::error::Result;

/// Load the municipality reference file.
///
/// Value columns are the hierarchy dimension names, broadest first.
pub fn load_municipality_reference(path: &Path) -> Result<ReferenceTable> {
    let columns: Vec<&str> = HIERARCHICAL_DIMENSIONS
        .iter()
        .map(|dimension| dimension.as_str())
        .collect();
    let mut required = vec![municipality::CODE_SHORT, municipality::CODE_LONG];
    required.extend(&columns);
    let rows = read_csv_rows(path, b',', &required)?;

    let mut builder = ReferenceTable::builder(columns.iter().copied());
    for row in &rows {
        let values = columns
            .iter()
            .map(|column| get_field(row, column).to_string())
            .collect();
        builder.insert(
            get_field(row, municipality::CODE_SHORT),
            get_field(row, municipality::CODE_LONG),
            values,
        )?;
    }
    let reference = builder.build();
    if reference.duplicate_keys() > 0 {
        warn!(
            duplicates = reference.duplicate_keys(),
            path = %path.display(),
            "duplicate municipality codes, keeping the first"
        );
    }
    info!(municipalities = reference.len(), "loaded municipality reference");
    Ok(reference)
}
