//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use sus_cli::logging::LogFormat;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(
    name = "sus-etl",
    version,
    about = "Normalize raw SUS mortality (SIM) and SRAG (SIVEP) exports",
    long_about = "Normalize raw Brazilian public-health exports into dated, \
                  dimension-labelled tables with numeric indicator fields.\n\n\
                  Also builds the CID and CBO lookups the SIM conversion reads, \
                  and patches per-source location files from the municipality reference."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert a folder of raw SIM death records.
    Sim(SimArgs),

    /// Convert the merged SIVEP dataset.
    Sivep(SivepArgs),

    /// Merge the yearly raw SIVEP exports into one file.
    SivepMerge(SivepMergeArgs),

    /// Build the cause-of-death lookup from the raw CID-9 and CID-10 files.
    CidLookup(CidLookupArgs),

    /// Build the occupation lookup from the raw CBO files.
    OccupationLookup(OccupationLookupArgs),

    /// Patch per-source locations files whose municipality column holds a code.
    MatchMunicipality(MatchMunicipalityArgs),

    /// Fan canonical location matches back out to the raw values.
    PatchLocations(PatchLocationsArgs),
}

/// Flags shared by the record conversions.
#[derive(Args, Debug, Clone)]
pub struct ConversionArgs {
    /// Fail on coded values missing from a dictionary instead of passing
    /// them through.
    #[arg(long = "strict-codes")]
    pub strict_codes: bool,

    /// Keep records without a parseable date (with an empty date).
    #[arg(long = "keep-undated")]
    pub keep_undated: bool,

    /// Municipality reference used to add the location hierarchy.
    #[arg(long = "municipality-reference", value_name = "CSV")]
    pub municipality_reference: Option<PathBuf>,

    /// Write the run report as JSON.
    #[arg(long = "report-json", value_name = "PATH")]
    pub report_json: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SimArgs {
    /// Folder with the raw `.csv`/`.csv.gz` SIM files.
    #[arg(long = "input-folder", value_name = "DIR")]
    pub input_folder: PathBuf,

    /// Output path; `#` is replaced by the batch index.
    #[arg(long = "output-pattern", value_name = "PATTERN")]
    pub output_pattern: String,

    /// Cause-of-death lookup built by `cid-lookup`.
    #[arg(long = "cause-of-death-lookup", value_name = "CSV")]
    pub cause_of_death_lookup: PathBuf,

    /// Occupation lookup built by `occupation-lookup`.
    #[arg(long = "occupation-lookup", value_name = "CSV")]
    pub occupation_lookup: PathBuf,

    /// Maximum rows per batch.
    #[arg(long = "max-rows", value_name = "ROWS", default_value_t = sus_model::DEFAULT_BATCH_ROWS)]
    pub max_rows: usize,

    /// Maximum on-disk input size per batch.
    #[arg(long = "max-bytes", value_name = "BYTES")]
    pub max_bytes: Option<u64>,

    #[command(flatten)]
    pub conversion: ConversionArgs,
}

#[derive(Args, Debug)]
pub struct SivepArgs {
    /// Merged SIVEP file (`;`-delimited).
    #[arg(long = "input", value_name = "PATH")]
    pub input: PathBuf,

    /// Output dated by symptom onset.
    #[arg(long = "output", value_name = "PATH")]
    pub output: PathBuf,

    /// Output of SRAG classification fields dated by evaluation date.
    #[arg(long = "output-by-evaluation-date", value_name = "PATH")]
    pub output_by_evaluation_date: PathBuf,

    #[command(flatten)]
    pub conversion: ConversionArgs,
}

#[derive(Args, Debug)]
pub struct SivepMergeArgs {
    /// 2019 export (Latin-1 encoded).
    #[arg(long = "sivep-2019", value_name = "PATH")]
    pub sivep_2019: PathBuf,

    #[arg(long = "sivep-2020", value_name = "PATH")]
    pub sivep_2020: PathBuf,

    #[arg(long = "sivep-2021", value_name = "PATH")]
    pub sivep_2021: PathBuf,

    /// Merged output; gzip-compressed when it ends in `.gz`.
    #[arg(long = "output", value_name = "PATH")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct CidLookupArgs {
    /// CID-9 file with `cid_id` and `cause_of_death_title`.
    #[arg(long = "cid9", value_name = "CSV")]
    pub cid9: PathBuf,

    /// CID-10 file with one `(ID) title` column.
    #[arg(long = "cid10", value_name = "CSV")]
    pub cid10: PathBuf,

    #[arg(long = "output", value_name = "PATH")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct OccupationLookupArgs {
    #[arg(long = "short-title", value_name = "CSV")]
    pub short_title: PathBuf,

    #[arg(long = "short-subgroup", value_name = "CSV")]
    pub short_subgroup: PathBuf,

    #[arg(long = "short-group", value_name = "CSV")]
    pub short_group: PathBuf,

    #[arg(long = "cbo94-to-cbo2002", value_name = "CSV")]
    pub cbo94_to_cbo2002: PathBuf,

    #[arg(long = "cbo-title", value_name = "CSV")]
    pub cbo_title: PathBuf,

    #[arg(long = "cbo-family", value_name = "CSV")]
    pub cbo_family: PathBuf,

    #[arg(long = "cbo-subgroup", value_name = "CSV")]
    pub cbo_subgroup: PathBuf,

    #[arg(long = "cbo-principal-subgroup", value_name = "CSV")]
    pub cbo_principal_subgroup: PathBuf,

    #[arg(long = "cbo-group", value_name = "CSV")]
    pub cbo_group: PathBuf,

    #[arg(long = "output", value_name = "PATH")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct MatchMunicipalityArgs {
    /// Locations file pattern; `#` is replaced by the source name.
    #[arg(long = "input-pattern", value_name = "PATTERN")]
    pub input_pattern: String,

    #[arg(long = "municipality-reference", value_name = "CSV")]
    pub municipality_reference: PathBuf,

    #[arg(long = "sources", value_name = "SOURCE", num_args = 1.., required = true)]
    pub sources: Vec<String>,
}

#[derive(Args, Debug)]
pub struct PatchLocationsArgs {
    /// Unmatched locations file pattern; `#` is replaced by the source name.
    #[arg(long = "unmatched-pattern", value_name = "PATTERN")]
    pub unmatched_pattern: String,

    /// Matched locations file pattern, rewritten in place.
    #[arg(long = "matched-pattern", value_name = "PATTERN")]
    pub matched_pattern: String,

    #[arg(long = "sources", value_name = "SOURCE", num_args = 1.., required = true)]
    pub sources: Vec<String>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogLevelArg> for LevelFilter {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Error => Self::ERROR,
            LogLevelArg::Warn => Self::WARN,
            LogLevelArg::Info => Self::INFO,
            LogLevelArg::Debug => Self::DEBUG,
            LogLevelArg::Trace => Self::TRACE,
        }
    }
}

impl From<LogFormatArg> for LogFormat {
    fn from(format: LogFormatArg) -> Self {
        match format {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Compact => Self::Compact,
            LogFormatArg::Json => Self::Json,
        }
    }
}
