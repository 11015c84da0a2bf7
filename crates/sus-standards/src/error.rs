use std::path::PathBuf;

use sus_model::SusError;

#[derive(Debug, thiserror::Error)]
pub enum StandardsError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("missing required column {column} in {path}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("invalid code {code:?}: {reason}")]
    InvalidCode { code: String, reason: String },

    #[error("invalid range {range:?}: {reason}")]
    InvalidRange { range: String, reason: String },

    #[error("code {code} falls into more than {limit} category ranges")]
    TooManyLevels { code: String, limit: usize },

    #[error("code {code} does not fall into any category range")]
    Uncategorized { code: String },

    #[error("{column}: code {code} matched {matches} rows by prefix, expected exactly one")]
    PrefixJoin {
        column: String,
        code: String,
        matches: usize,
    },

    #[error(transparent)]
    Model(#[from] SusError),
}

impl StandardsError {
    pub(crate) fn invalid_code(code: &str, reason: impl Into<String>) -> Self {
        Self::InvalidCode {
            code: code.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_range(range: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            range: range.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StandardsError>;
