use anyhow::Result;
use chrono::Local;
use tracing::info;

use sus_cli::pipeline::{
    LocationFanOut, LocationPatch, MergeInput, MergeResult, SimPaths, SimRunResult, SivepPaths,
    SivepRunResult, fan_out_location_files, match_municipality_codes, merge_sivep, run_sim,
    run_sivep, write_cause_of_death_lookup, write_occupation_lookup, write_report_json,
};
use sus_ingest::FilePattern;
use sus_model::{BatchLimits, ConversionOptions, RemapMode, TextEncoding, UndatedPolicy};
use sus_standards::OccupationSources;

use crate::cli::{
    CidLookupArgs, ConversionArgs, MatchMunicipalityArgs, OccupationLookupArgs,
    PatchLocationsArgs, SimArgs, SivepArgs, SivepMergeArgs,
};

fn conversion_options(args: &ConversionArgs, batch: BatchLimits) -> ConversionOptions {
    let remap_mode = if args.strict_codes {
        RemapMode::Strict
    } else {
        RemapMode::Lenient
    };
    let undated = if args.keep_undated {
        UndatedPolicy::Keep
    } else {
        UndatedPolicy::Drop
    };
    ConversionOptions::default()
        .with_remap_mode(remap_mode)
        .with_undated(undated)
        .with_batch(batch)
}

pub fn run_sim_command(args: &SimArgs) -> Result<SimRunResult> {
    let options = conversion_options(
        &args.conversion,
        BatchLimits {
            max_rows: args.max_rows,
            max_bytes: args.max_bytes,
        },
    );
    let paths = SimPaths {
        input_folder: args.input_folder.clone(),
        output_pattern: FilePattern::new(args.output_pattern.clone()),
        cause_of_death_lookup: args.cause_of_death_lookup.clone(),
        occupation_lookup: args.occupation_lookup.clone(),
        municipality_reference: args.conversion.municipality_reference.clone(),
    };
    let result = run_sim(&paths, &options)?;
    if let Some(path) = &args.conversion.report_json {
        write_report_json(path, &result)?;
        info!(path = %path.display(), "wrote run report");
    }
    Ok(result)
}

pub fn run_sivep_command(args: &SivepArgs) -> Result<SivepRunResult> {
    let options = conversion_options(&args.conversion, BatchLimits::default());
    let paths = SivepPaths {
        input: args.input.clone(),
        output: args.output.clone(),
        output_by_evaluation_date: args.output_by_evaluation_date.clone(),
        municipality_reference: args.conversion.municipality_reference.clone(),
    };
    let today = Local::now().date_naive();
    let result = run_sivep(&paths, today, &options)?;
    if let Some(path) = &args.conversion.report_json {
        write_report_json(path, &result)?;
        info!(path = %path.display(), "wrote run report");
    }
    Ok(result)
}

pub fn run_sivep_merge(args: &SivepMergeArgs) -> Result<MergeResult> {
    let inputs = [
        MergeInput {
            path: args.sivep_2021.clone(),
            encoding: TextEncoding::Utf8,
        },
        MergeInput {
            path: args.sivep_2020.clone(),
            encoding: TextEncoding::Utf8,
        },
        MergeInput {
            path: args.sivep_2019.clone(),
            encoding: TextEncoding::Latin1,
        },
    ];
    merge_sivep(&inputs, &args.output)
}

pub fn run_cid_lookup(args: &CidLookupArgs) -> Result<usize> {
    write_cause_of_death_lookup(&args.cid9, &args.cid10, &args.output)
}

pub fn run_occupation_lookup(args: &OccupationLookupArgs) -> Result<usize> {
    let sources = OccupationSources {
        short_title: args.short_title.clone(),
        short_subgroup: args.short_subgroup.clone(),
        short_group: args.short_group.clone(),
        cbo94_to_cbo2002: args.cbo94_to_cbo2002.clone(),
        cbo_title: args.cbo_title.clone(),
        cbo_family: args.cbo_family.clone(),
        cbo_subgroup: args.cbo_subgroup.clone(),
        cbo_principal_subgroup: args.cbo_principal_subgroup.clone(),
        cbo_group: args.cbo_group.clone(),
    };
    write_occupation_lookup(&sources, &args.output)
}

pub fn run_match_municipality(args: &MatchMunicipalityArgs) -> Result<Vec<LocationPatch>> {
    match_municipality_codes(
        &FilePattern::new(args.input_pattern.clone()),
        &args.municipality_reference,
        &args.sources,
    )
}

pub fn run_patch_locations(args: &PatchLocationsArgs) -> Result<Vec<LocationFanOut>> {
    fan_out_location_files(
        &FilePattern::new(args.unmatched_pattern.clone()),
        &FilePattern::new(args.matched_pattern.clone()),
        &args.sources,
    )
}
