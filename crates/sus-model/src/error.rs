use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SusError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing required column {column} in {source_name}")]
    MissingColumn { source_name: String, column: String },

    #[error("{path}: header has a single column {header:?}; expected delimiter {expected:?}")]
    WrongDelimiter {
        path: PathBuf,
        header: String,
        expected: char,
    },

    #[error("column {column}: {count} value(s) without a mapping: {values:?}")]
    UnmappedCodes {
        column: String,
        count: usize,
        values: Vec<String>,
    },

    #[error("{stage}: row count changed from {expected} to {actual}")]
    RowCountChanged {
        stage: String,
        expected: usize,
        actual: usize,
    },

    #[error("reference row {row} has neither a short nor a long code")]
    EmptyReferenceKey { row: usize },

    #[error("{0}")]
    Message(String),
}

impl SusError {
    pub fn missing_column(source_name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            source_name: source_name.into(),
            column: column.into(),
        }
    }

    /// Fails with [`SusError::RowCountChanged`] unless `actual == expected`.
    pub fn ensure_row_count(stage: &str, expected: usize, actual: usize) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::RowCountChanged {
                stage: stage.to_string(),
                expected,
                actual,
            })
        }
    }
}

pub type Result<T> = std::result::Result<T, SusError>;
