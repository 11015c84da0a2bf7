//! Error types for raw data ingestion.

use std::path::PathBuf;

use sus_model::SusError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed delimited data in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid text in {path} at line {line}, column {column}: not valid for the declared encoding")]
    InvalidText {
        path: PathBuf,
        line: u64,
        column: usize,
    },

    #[error("{path}: {source}")]
    Schema {
        path: PathBuf,
        #[source]
        source: SusError,
    },
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IngestError::DirectoryNotFound {
            path: PathBuf::from("/data/sim"),
        };
        assert_eq!(err.to_string(), "directory not found: /data/sim");

        let err = IngestError::Schema {
            path: PathBuf::from("DO2020.csv"),
            source: SusError::missing_column("sim", "CAUSABAS"),
        };
        assert_eq!(
            err.to_string(),
            "DO2020.csv: missing required column CAUSABAS in sim"
        );
    }
}
