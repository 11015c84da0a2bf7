//! File-level stages behind each subcommand.
//!
//! Every stage loads its inputs through `sus_ingest`/`sus_standards`, runs the
//! matching `sus_transform` conversion and writes the result. Failures carry
//! the path or source that caused them.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::Serialize;
use sus_ingest::{
    Batch, Batcher, FilePattern, delimiter_for, list_data_files, merge_tables, output_columns,
    read_raw_table, read_table, write_table,
};
use sus_model::{ConversionOptions, ReferenceTable, TextEncoding};
use sus_standards::{
    OccupationSources, build_cause_of_death_lookup, build_occupation_lookup, cause_of_death_table,
    load_cause_of_death_lookup, load_municipality_reference, load_occupation_lookup,
};
use sus_transform::{
    JoinReport, KeyResolver, NonExactMatch, SimConfig, SimLookups, SimReport, SivepConfig,
    SivepReport, UnmatchedKey, convert_sim, convert_sivep, fan_out_locations, patch_locations,
    unmatched_key_summary,
};
use tracing::{info, info_span, warn};

/// Converted files are comma-delimited.
pub const OUTPUT_DELIMITER: u8 = b',';
/// Raw SIVEP exports and the merged SIVEP file are semicolon-delimited.
pub const SIVEP_DELIMITER: u8 = b';';
const LOCATIONS_DELIMITER: u8 = b',';

#[derive(Debug, Clone)]
pub struct SimPaths {
    pub input_folder: PathBuf,
    /// Output path; `#` is replaced by the batch index.
    pub output_pattern: FilePattern,
    pub cause_of_death_lookup: PathBuf,
    pub occupation_lookup: PathBuf,
    pub municipality_reference: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct SimBatchResult {
    pub index: usize,
    pub files: Vec<PathBuf>,
    pub output: PathBuf,
    pub report: SimReport,
}

#[derive(Debug, Serialize)]
pub struct SimRunResult {
    pub options: ConversionOptions,
    pub batches: Vec<SimBatchResult>,
    pub unmatched_municipalities: Vec<UnmatchedKey>,
}

impl SimRunResult {
    pub fn input_rows(&self) -> usize {
        self.batches.iter().map(|b| b.report.input_rows).sum()
    }

    pub fn output_rows(&self) -> usize {
        self.batches.iter().map(|b| b.report.output_rows).sum()
    }
}

fn load_municipalities(path: Option<&Path>) -> Result<Option<ReferenceTable>> {
    path.map(|path| {
        load_municipality_reference(path)
            .with_context(|| format!("load municipality reference {}", path.display()))
    })
    .transpose()
}

/// Take the non-exact matches out of a join report, leaving its counts.
fn drain_non_exact(report: Option<&mut JoinReport>, into: &mut Vec<NonExactMatch>) {
    if let Some(report) = report {
        into.append(&mut report.non_exact);
    }
}

/// Convert every raw SIM file of a folder, batch by batch.
pub fn run_sim(paths: &SimPaths, options: &ConversionOptions) -> Result<SimRunResult> {
    let config = SimConfig::standard();
    let causes = load_cause_of_death_lookup(&paths.cause_of_death_lookup).with_context(|| {
        format!(
            "load cause of death lookup {}",
            paths.cause_of_death_lookup.display()
        )
    })?;
    let occupations = load_occupation_lookup(&paths.occupation_lookup).with_context(|| {
        format!(
            "load occupation lookup {}",
            paths.occupation_lookup.display()
        )
    })?;
    let municipalities = load_municipalities(paths.municipality_reference.as_deref())?;
    let lookups = SimLookups {
        cause_of_death: &causes,
        occupation: &occupations,
        municipality: municipalities.as_ref(),
    };

    let files = list_data_files(&paths.input_folder).context("list SIM input files")?;
    if files.is_empty() {
        bail!(
            "no .csv or .csv.gz files in {}",
            paths.input_folder.display()
        );
    }
    info!(files = files.len(), folder = %paths.input_folder.display(), "found SIM files");

    let mut result = SimRunResult {
        options: options.clone(),
        batches: Vec::new(),
        unmatched_municipalities: Vec::new(),
    };
    let mut non_exact = Vec::new();
    let mut batcher = Batcher::new(options.batch);
    for path in files {
        let schema = config.schema(delimiter_for(&path));
        let table = read_table(&path, &schema).with_context(|| format!("read {}", path.display()))?;
        if table.is_empty() {
            bail!("input file {} has no rows", path.display());
        }
        let bytes = fs::metadata(&path)
            .with_context(|| format!("stat {}", path.display()))?
            .len();
        if let Some(batch) = batcher.push(path, table, bytes) {
            let converted =
                convert_sim_batch(batch, &config, lookups, options, &paths.output_pattern)?;
            result.batches.push(converted);
        }
    }
    if let Some(batch) = batcher.finish() {
        let converted = convert_sim_batch(batch, &config, lookups, options, &paths.output_pattern)?;
        result.batches.push(converted);
    }

    for batch in &mut result.batches {
        drain_non_exact(batch.report.municipality.as_mut(), &mut non_exact);
    }
    result.unmatched_municipalities =
        unmatched_key_summary(&non_exact).context("summarize unmatched municipality codes")?;
    Ok(result)
}

fn convert_sim_batch(
    batch: Batch,
    config: &SimConfig,
    lookups: SimLookups<'_>,
    options: &ConversionOptions,
    output_pattern: &FilePattern,
) -> Result<SimBatchResult> {
    let span = info_span!("sim_batch", batch = batch.index, files = batch.files.len());
    let _guard = span.enter();
    let start = Instant::now();

    if batch.index > 0 && !output_pattern.has_placeholder() {
        bail!("output pattern {output_pattern} has no '#' but the input needs several batches");
    }
    let Batch {
        index,
        files,
        table,
        ..
    } = batch;
    let converted = convert_sim(table, config, lookups, options)
        .with_context(|| format!("convert SIM batch {index}"))?;
    let output = output_pattern.build(index);
    write_table(
        &output,
        &converted.table,
        &output_columns(&converted.table),
        OUTPUT_DELIMITER,
    )
    .with_context(|| format!("write {}", output.display()))?;

    info!(
        batch = index,
        rows = converted.report.output_rows,
        duration_ms = start.elapsed().as_millis(),
        "batch written"
    );
    Ok(SimBatchResult {
        index,
        files,
        output,
        report: converted.report,
    })
}

#[derive(Debug, Clone)]
pub struct SivepPaths {
    pub input: PathBuf,
    pub output: PathBuf,
    pub output_by_evaluation_date: PathBuf,
    pub municipality_reference: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct SivepRunResult {
    pub options: ConversionOptions,
    /// Latest accepted secondary date, ISO formatted.
    pub today: String,
    pub report: SivepReport,
    pub unmatched_municipalities: Vec<UnmatchedKey>,
}

/// Convert the merged SIVEP file into its two outputs.
pub fn run_sivep(
    paths: &SivepPaths,
    today: NaiveDate,
    options: &ConversionOptions,
) -> Result<SivepRunResult> {
    let span = info_span!("sivep", input = %paths.input.display());
    let _guard = span.enter();

    let config = SivepConfig::standard();
    let municipalities = load_municipalities(paths.municipality_reference.as_deref())?;
    let table = read_table(&paths.input, &config.schema())
        .with_context(|| format!("read {}", paths.input.display()))?;
    let mut converted = convert_sivep(table, &config, today, municipalities.as_ref(), options)
        .context("convert SIVEP")?;

    write_table(
        &paths.output,
        &converted.table,
        &converted.table.headers,
        OUTPUT_DELIMITER,
    )
    .with_context(|| format!("write {}", paths.output.display()))?;
    write_table(
        &paths.output_by_evaluation_date,
        &converted.by_evaluation_date,
        &converted.by_evaluation_date.headers,
        OUTPUT_DELIMITER,
    )
    .with_context(|| format!("write {}", paths.output_by_evaluation_date.display()))?;

    let mut non_exact = Vec::new();
    drain_non_exact(converted.report.municipality.as_mut(), &mut non_exact);
    let unmatched_municipalities =
        unmatched_key_summary(&non_exact).context("summarize unmatched municipality codes")?;
    Ok(SivepRunResult {
        options: options.clone(),
        today: today.to_string(),
        report: converted.report,
        unmatched_municipalities,
    })
}

/// One raw SIVEP export to merge.
#[derive(Debug, Clone)]
pub struct MergeInput {
    pub path: PathBuf,
    pub encoding: TextEncoding,
}

#[derive(Debug, Serialize)]
pub struct MergeResult {
    /// Rows read per input, in preference order.
    pub inputs: Vec<(PathBuf, usize)>,
    pub rows: usize,
    pub columns: usize,
}

/// Merge raw SIVEP exports given newest first.
pub fn merge_sivep(inputs: &[MergeInput], output: &Path) -> Result<MergeResult> {
    let start = Instant::now();
    let mut tables = Vec::with_capacity(inputs.len());
    let mut counts = Vec::with_capacity(inputs.len());
    for input in inputs {
        let table = read_raw_table(&input.path, SIVEP_DELIMITER, input.encoding)
            .with_context(|| format!("read {}", input.path.display()))?;
        info!(path = %input.path.display(), rows = table.row_count(), "read SIVEP export");
        counts.push((input.path.clone(), table.row_count()));
        tables.push(table);
    }
    let merged = merge_tables(tables);
    write_table(output, &merged, &merged.headers, SIVEP_DELIMITER)
        .with_context(|| format!("write {}", output.display()))?;
    info!(
        rows = merged.row_count(),
        columns = merged.column_count(),
        duration_ms = start.elapsed().as_millis(),
        "merged SIVEP exports"
    );
    Ok(MergeResult {
        inputs: counts,
        rows: merged.row_count(),
        columns: merged.column_count(),
    })
}

/// Build the cause-of-death lookup file. Returns the number of codes.
pub fn write_cause_of_death_lookup(cid9: &Path, cid10: &Path, output: &Path) -> Result<usize> {
    let entries = build_cause_of_death_lookup(cid9, cid10).context("build CID lookup")?;
    let table = cause_of_death_table(&entries);
    write_table(output, &table, &table.headers, OUTPUT_DELIMITER)
        .with_context(|| format!("write {}", output.display()))?;
    Ok(table.row_count())
}

/// Build the occupation lookup file. Returns the number of codes.
pub fn write_occupation_lookup(sources: &OccupationSources, output: &Path) -> Result<usize> {
    let table = build_occupation_lookup(sources).context("build occupation lookup")?;
    write_table(output, &table, &table.headers, OUTPUT_DELIMITER)
        .with_context(|| format!("write {}", output.display()))?;
    Ok(table.row_count())
}

fn source_paths(pattern: &FilePattern, sources: &[String]) -> Result<Vec<(String, PathBuf)>> {
    let paths: Vec<(String, PathBuf)> = sources
        .iter()
        .map(|source| (source.clone(), pattern.build(source)))
        .collect();
    let missing: Vec<String> = paths
        .iter()
        .filter(|(_, path)| !path.is_file())
        .map(|(_, path)| path.display().to_string())
        .collect();
    if !missing.is_empty() {
        bail!("missing input files: {}", missing.join(", "));
    }
    Ok(paths)
}

#[derive(Debug, Serialize)]
pub struct LocationPatch {
    pub source: String,
    pub path: PathBuf,
    pub report: JoinReport,
}

/// Patch each source's locations file in place from the municipality
/// reference.
pub fn match_municipality_codes(
    pattern: &FilePattern,
    reference: &Path,
    sources: &[String],
) -> Result<Vec<LocationPatch>> {
    let reference = load_municipalities(Some(reference))?
        .context("municipality reference not loaded")?;
    let resolver = KeyResolver::exact();
    let mut patches = Vec::with_capacity(sources.len());
    for (source, path) in source_paths(pattern, sources)? {
        let span = info_span!("match_municipality", source = %source);
        let _guard = span.enter();
        let mut table = read_raw_table(&path, LOCATIONS_DELIMITER, TextEncoding::Utf8)
            .with_context(|| format!("read {}", path.display()))?;
        let mut report = patch_locations(&mut table, &reference, &resolver)
            .with_context(|| format!("patch {}", path.display()))?;
        for unmatched in &report.non_exact {
            warn!(code = %unmatched.key, "no location data for municipality code");
        }
        report.non_exact.clear();
        write_table(&path, &table, &table.headers, LOCATIONS_DELIMITER)
            .with_context(|| format!("write {}", path.display()))?;
        patches.push(LocationPatch {
            source,
            path,
            report,
        });
    }
    Ok(patches)
}

#[derive(Debug, Serialize)]
pub struct LocationFanOut {
    pub source: String,
    pub path: PathBuf,
    pub matched_rows: usize,
    pub output_rows: usize,
}

/// Rewrite each source's matched locations file with one row per raw
/// hierarchy that produced the canonical match.
pub fn fan_out_location_files(
    unmatched_pattern: &FilePattern,
    matched_pattern: &FilePattern,
    sources: &[String],
) -> Result<Vec<LocationFanOut>> {
    let unmatched_paths = source_paths(unmatched_pattern, sources)?;
    let matched_paths = source_paths(matched_pattern, sources)?;
    let mut results = Vec::with_capacity(sources.len());
    for ((source, unmatched_path), (_, matched_path)) in
        unmatched_paths.into_iter().zip(matched_paths)
    {
        let span = info_span!("patch_locations", source = %source);
        let _guard = span.enter();
        let unmatched = read_raw_table(&unmatched_path, LOCATIONS_DELIMITER, TextEncoding::Utf8)
            .with_context(|| format!("read {}", unmatched_path.display()))?;
        let matched = read_raw_table(&matched_path, LOCATIONS_DELIMITER, TextEncoding::Utf8)
            .with_context(|| format!("read {}", matched_path.display()))?;
        let output = fan_out_locations(&unmatched, &matched)
            .with_context(|| format!("fan out {}", matched_path.display()))?;
        write_table(&matched_path, &output, &matched.headers, LOCATIONS_DELIMITER)
            .with_context(|| format!("write {}", matched_path.display()))?;
        results.push(LocationFanOut {
            source,
            path: matched_path,
            matched_rows: matched.row_count(),
            output_rows: output.row_count(),
        });
    }
    Ok(results)
}

/// Serialize a run result as pretty JSON.
pub fn write_report_json<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("serialize report")?;
    fs::write(path, json).with_context(|| format!("write {}", path.display()))
}
