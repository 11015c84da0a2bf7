//! Library side of the `sus-etl` command line.

pub mod logging;
pub mod pipeline;
