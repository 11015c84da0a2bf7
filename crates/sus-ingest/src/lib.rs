pub mod batch;
pub mod csv_table;
pub mod discovery;
pub mod error;
pub mod merge;
pub mod pattern;
pub mod writer;

pub use batch::{Batch, Batcher};
pub use csv_table::{read_raw_table, read_table};
pub use discovery::{delimiter_for, is_compressed, list_data_files};
pub use error::{IngestError, Result};
pub use merge::merge_tables;
pub use pattern::FilePattern;
pub use writer::{output_columns, write_table};
