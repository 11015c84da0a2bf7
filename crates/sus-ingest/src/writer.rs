//! Delimited output, gzip-compressed when the path ends in `.gz`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use sus_model::{FIELD_PREFIX, RecordTable};
use tracing::info;

use crate::discovery::is_compressed;
use crate::error::{IngestError, Result};

/// Output column order: dimension columns as they appear in the table, then
/// `*field_` columns sorted by name.
pub fn output_columns(table: &RecordTable) -> Vec<String> {
    let (mut fields, mut columns): (Vec<String>, Vec<String>) = table
        .headers
        .iter()
        .cloned()
        .partition(|header| header.starts_with(FIELD_PREFIX));
    fields.sort();
    columns.extend(fields);
    columns
}

/// Write `columns` of `table` to `path`.
///
/// Fails with [`IngestError::Schema`] when a listed column is missing.
pub fn write_table(path: &Path, table: &RecordTable, columns: &[String], delimiter: u8) -> Result<()> {
    let projected = table
        .select(columns, "output")
        .map_err(|source| IngestError::Schema {
            path: path.to_path_buf(),
            source,
        })?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| IngestError::FileWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let file = File::create(path).map_err(|e| IngestError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    let sink = BufWriter::new(file);

    if is_compressed(path) {
        let encoder = GzEncoder::new(sink, Compression::best());
        let encoder = write_rows(path, encoder, &projected, delimiter)?;
        let mut sink = encoder.finish().map_err(|e| IngestError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        sink.flush().map_err(|e| IngestError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
    } else {
        let mut sink = write_rows(path, sink, &projected, delimiter)?;
        sink.flush().map_err(|e| IngestError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    info!(
        path = %path.display(),
        rows = projected.row_count(),
        columns = projected.column_count(),
        "wrote output"
    );
    Ok(())
}

fn write_rows<W: Write>(path: &Path, sink: W, table: &RecordTable, delimiter: u8) -> Result<W> {
    let csv_error = |source| IngestError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = WriterBuilder::new().delimiter(delimiter).from_writer(sink);
    writer.write_record(&table.headers).map_err(csv_error)?;
    for row in &table.rows {
        writer.write_record(row).map_err(csv_error)?;
    }
    writer.into_inner().map_err(|e| IngestError::FileWrite {
        path: path.to_path_buf(),
        source: e.into_error(),
    })
}
