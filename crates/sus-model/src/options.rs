//! Configuration options for a conversion run.

use serde::{Deserialize, Serialize};

/// What to do with a raw code that has no entry in its column's dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RemapMode {
    /// Abort the run, listing the unmapped codes.
    Strict,
    /// Keep the raw value, count it and log it.
    #[default]
    Lenient,
}

/// What to do with records whose date cascade produced no date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UndatedPolicy {
    /// Remove the record and report the count.
    #[default]
    Drop,
    /// Keep the record with an empty date.
    Keep,
}

/// Value written to an indicator field when the record does not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndicatorPolicy {
    /// Leave the cell empty.
    Missing,
    /// Write `0`.
    Zero,
}

impl IndicatorPolicy {
    pub fn unset_value(self) -> &'static str {
        match self {
            Self::Missing => "",
            Self::Zero => "0",
        }
    }
}

/// Thresholds for flushing a batch of input files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchLimits {
    /// Maximum cumulative row count of one batch.
    pub max_rows: usize,
    /// Maximum cumulative on-disk (compressed) size of one batch.
    pub max_bytes: Option<u64>,
}

/// Default row threshold: five million lines per batch.
pub const DEFAULT_BATCH_ROWS: usize = 5_000_000;

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_BATCH_ROWS,
            max_bytes: None,
        }
    }
}

impl BatchLimits {
    /// Whether a batch holding `rows`/`bytes` can take `extra_rows`/`extra_bytes` more.
    pub fn fits(&self, rows: usize, bytes: u64, extra_rows: usize, extra_bytes: u64) -> bool {
        if rows + extra_rows > self.max_rows {
            return false;
        }
        match self.max_bytes {
            Some(max) => bytes + extra_bytes <= max,
            None => true,
        }
    }
}

/// Options controlling a conversion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionOptions {
    pub remap_mode: RemapMode,
    pub undated: UndatedPolicy,
    pub batch: BatchLimits,
}

impl ConversionOptions {
    /// Options that refuse unmapped codes.
    pub fn strict() -> Self {
        Self {
            remap_mode: RemapMode::Strict,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_remap_mode(mut self, mode: RemapMode) -> Self {
        self.remap_mode = mode;
        self
    }

    #[must_use]
    pub fn with_undated(mut self, policy: UndatedPolicy) -> Self {
        self.undated = policy;
        self
    }

    #[must_use]
    pub fn with_batch(mut self, batch: BatchLimits) -> Self {
        self.batch = batch;
        self
    }
}
