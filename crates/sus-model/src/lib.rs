//! Data model for SUS (Brazilian public-health) record normalization.

pub mod codes;
pub mod dimension;
pub mod error;
pub mod options;
pub mod reference;
pub mod schema;
pub mod table;

pub use codes::{CodeEntry, MAX_CATEGORY_LEVELS};
pub use dimension::{
    DATE_COLUMN, Dimension, FIELD_PREFIX, HIERARCHICAL_DIMENSIONS, field_name,
};
pub use error::{Result, SusError};
pub use options::{
    BatchLimits, ConversionOptions, DEFAULT_BATCH_ROWS, IndicatorPolicy, RemapMode, UndatedPolicy,
};
pub use reference::{ReferenceTable, ReferenceTableBuilder};
pub use schema::{SourceSchema, TextEncoding};
pub use table::RecordTable;
