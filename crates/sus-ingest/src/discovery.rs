//! Raw file discovery.

use std::path::{Path, PathBuf};

use crate::error::{IngestError, Result};

/// Fetal-death exports are the only SIM files written with commas.
const COMMA_DELIMITED_MARKER: &str = "DOFET";

/// Lists all `.csv` and `.csv.gz` files in a directory.
///
/// Returns files sorted by filename.
pub fn list_data_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_file() && is_data_file(&path) {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn is_data_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    let name = name.to_ascii_lowercase();
    name.ends_with(".csv") || name.ends_with(".csv.gz")
}

/// Whether the file is gzip-compressed, judged by its extension.
pub fn is_compressed(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// Field delimiter used by a raw SIM export.
pub fn delimiter_for(path: &Path) -> u8 {
    let is_fetal = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.to_ascii_uppercase().contains(COMMA_DELIMITED_MARKER));
    if is_fetal { b',' } else { b';' }
}
