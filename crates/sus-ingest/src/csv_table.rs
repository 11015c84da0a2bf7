use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder};
use encoding_rs::WINDOWS_1252;
use flate2::read::MultiGzDecoder;
use sus_model::{RecordTable, SourceSchema, SusError, TextEncoding};
use tracing::debug;

use crate::discovery::is_compressed;
use crate::error::{IngestError, Result};

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

fn decode_field(raw: &[u8], encoding: TextEncoding) -> Option<String> {
    let text = match encoding {
        TextEncoding::Utf8 => Cow::Borrowed(std::str::from_utf8(raw).ok()?),
        TextEncoding::Latin1 => WINDOWS_1252.decode_without_bom_handling(raw).0,
    };
    Some(text.trim().to_string())
}

fn invalid_text(path: &Path, record: &ByteRecord, column: usize) -> IngestError {
    IngestError::InvalidText {
        path: path.to_path_buf(),
        line: record.position().map_or(0, csv::Position::line),
        column: column + 1,
    }
}

fn open_reader(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).map_err(|e| IngestError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let reader = BufReader::new(file);
    if is_compressed(path) {
        // pigz writes multi-member streams.
        Ok(Box::new(MultiGzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

fn other_delimiter(delimiter: u8) -> u8 {
    if delimiter == b',' { b';' } else { b',' }
}

/// Read a delimited file keeping only the columns `keep` accepts.
///
/// Every value stays text. Rows shorter than the header are padded with empty
/// values and rows without any non-empty value are skipped.
fn read_delimited<F>(
    path: &Path,
    delimiter: u8,
    encoding: TextEncoding,
    keep: F,
) -> Result<RecordTable>
where
    F: Fn(&str) -> bool,
{
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(open_reader(path)?);

    let mut records = reader.byte_records();
    let header: ByteRecord = match records.next() {
        Some(record) => record.map_err(|e| IngestError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?,
        None => return Ok(RecordTable::default()),
    };
    let headers = header
        .iter()
        .enumerate()
        .map(|(idx, raw)| {
            decode_field(raw, encoding)
                .map(|name| normalize_header(&name))
                .ok_or_else(|| invalid_text(path, &header, idx))
        })
        .collect::<Result<Vec<String>>>()?;

    if let [only] = headers.as_slice()
        && only.contains(char::from(other_delimiter(delimiter)))
    {
        return Err(IngestError::Schema {
            path: path.to_path_buf(),
            source: SusError::WrongDelimiter {
                path: path.to_path_buf(),
                header: only.clone(),
                expected: char::from(delimiter),
            },
        });
    }

    let kept: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, name)| keep(name.as_str()))
        .map(|(idx, _)| idx)
        .collect();
    let mut table = RecordTable::new(kept.iter().map(|&idx| headers[idx].clone()));

    let mut skipped = 0usize;
    for record in records {
        let record = record.map_err(|e| IngestError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;
        if record.iter().all(|raw| raw.iter().all(u8::is_ascii_whitespace)) {
            skipped += 1;
            continue;
        }
        let row = kept
            .iter()
            .map(|&idx| match record.get(idx) {
                Some(raw) => {
                    decode_field(raw, encoding).ok_or_else(|| invalid_text(path, &record, idx))
                }
                None => Ok(String::new()),
            })
            .collect::<Result<Vec<_>>>()?;
        table.push_row(row);
    }

    debug!(
        path = %path.display(),
        rows = table.row_count(),
        columns = table.column_count(),
        skipped,
        "read delimited file"
    );
    Ok(table)
}

/// Read every column of a delimited file.
pub fn read_raw_table(path: &Path, delimiter: u8, encoding: TextEncoding) -> Result<RecordTable> {
    read_delimited(path, delimiter, encoding, |_| true)
}

/// Read a delimited file and conform it to `schema`.
///
/// Only the columns the schema declares (or aliases) are loaded; a schema
/// without any declared column keeps everything.
pub fn read_table(path: &Path, schema: &SourceSchema) -> Result<RecordTable> {
    let declares_columns = !schema.required.is_empty() || !schema.optional.is_empty();
    let mut table = read_delimited(path, schema.delimiter, schema.encoding, |column| {
        !declares_columns || schema.wants(column)
    })?;
    schema
        .conform(&mut table)
        .map_err(|source| IngestError::Schema {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(table)
}
