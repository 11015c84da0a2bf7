//! `sus-etl`: SUS raw export normalizer.

use std::io::{self, IsTerminal};

use clap::{ColorChoice, Parser};
use sus_cli::logging::{LogConfig, LogFormat, init_logging};
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod summary;

use crate::cli::{Cli, Command};
use crate::commands::{
    run_cid_lookup, run_match_municipality, run_occupation_lookup, run_patch_locations,
    run_sim_command, run_sivep_command, run_sivep_merge,
};
use crate::summary::{
    print_location_fan_out, print_location_patches, print_merge_summary, print_sim_summary,
    print_sivep_summary,
};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let outcome = match &cli.command {
        Command::Sim(args) => run_sim_command(args).map(|result| print_sim_summary(&result)),
        Command::Sivep(args) => run_sivep_command(args).map(|result| print_sivep_summary(&result)),
        Command::SivepMerge(args) => run_sivep_merge(args).map(|result| print_merge_summary(&result)),
        Command::CidLookup(args) => run_cid_lookup(args).map(|rows| {
            println!("Wrote {rows} cause of death codes to {}", args.output.display());
        }),
        Command::OccupationLookup(args) => run_occupation_lookup(args).map(|rows| {
            println!("Wrote {rows} occupation codes to {}", args.output.display());
        }),
        Command::MatchMunicipality(args) => {
            run_match_municipality(args).map(|patches| print_location_patches(&patches))
        }
        Command::PatchLocations(args) => {
            run_patch_locations(args).map(|results| print_location_fan_out(&results))
        }
    };
    let exit_code = match outcome {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

/// Logging configuration from CLI flags. `--log-level` wins over `-v`/`-q`,
/// and either one turns `RUST_LOG` off.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let explicit_level = cli.verbosity.is_present() || cli.log_level.is_some();
    let with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    LogConfig {
        level_filter: cli
            .log_level
            .map_or_else(|| cli.verbosity.tracing_level_filter(), LevelFilter::from),
        use_env_filter: !explicit_level,
        with_ansi,
        format: LogFormat::from(cli.log_format),
        log_file: cli.log_file.clone(),
        ..LogConfig::default()
    }
}
