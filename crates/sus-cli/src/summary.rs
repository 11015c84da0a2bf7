use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use sus_cli::pipeline::{
    LocationFanOut, LocationPatch, MergeResult, SimRunResult, SivepRunResult,
};
use sus_transform::{MatchStage, UnmatchedKey};

/// Distinct unmatched keys listed before the rest is summarized in one line.
const MAX_UNMATCHED_ROWS: usize = 20;

pub fn print_sim_summary(result: &SimRunResult) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Batch"),
        header_cell("Files"),
        header_cell("Input rows"),
        header_cell("Undated"),
        header_cell("Output rows"),
        header_cell("Unmapped"),
        header_cell("Unknown CID"),
        header_cell("Unknown CBO"),
        header_cell("Output"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 1..=7 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for batch in &result.batches {
        let report = &batch.report;
        table.add_row(vec![
            Cell::new(batch.index).add_attribute(Attribute::Bold),
            Cell::new(batch.files.len()),
            Cell::new(report.input_rows),
            count_cell(report.dates.undated, Color::Yellow),
            Cell::new(report.output_rows),
            count_cell(report.remap.total_unmapped(), Color::Yellow),
            count_cell(report.causes.unmatched, Color::Yellow),
            count_cell(
                report.occupation.unknown + report.mothers_occupation.unknown,
                Color::Yellow,
            ),
            Cell::new(batch.output.display()),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(result.batches.iter().map(|b| b.files.len()).sum::<usize>()),
        Cell::new(result.input_rows()).add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(result.output_rows()).add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
        dim_cell("-"),
        dim_cell("-"),
    ]);
    println!("{table}");
    print_unmatched(&result.unmatched_municipalities);
}

pub fn print_sivep_summary(result: &SivepRunResult) {
    let report = &result.report;
    let mut table = Table::new();
    table.set_header(vec![header_cell("Measure"), header_cell("Count")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    let rows = [
        ("Input rows", report.input_rows),
        ("Undated", report.dates.undated),
        ("Output rows", report.output_rows),
        ("Rejected secondary dates", report.rejected_optional_dates),
        ("Deaths", report.deaths),
        ("Rows by evaluation date", report.evaluation_rows),
    ];
    for (label, count) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(count)]);
    }
    for (field, count) in &report.classifications {
        table.add_row(vec![Cell::new(format!("  {field}")).fg(Color::Blue), Cell::new(count)]);
    }
    println!("{table}");
    print_unmatched(&result.unmatched_municipalities);
}

pub fn print_merge_summary(result: &MergeResult) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Input"), header_cell("Rows")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for (path, rows) in &result.inputs {
        table.add_row(vec![Cell::new(path.display()), Cell::new(rows)]);
    }
    table.add_row(vec![
        Cell::new(format!("TOTAL ({} columns)", result.columns))
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(result.rows).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
}

pub fn print_location_patches(patches: &[LocationPatch]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("Rows"),
        header_cell("Matched"),
        header_cell("Unmatched"),
        header_cell("File"),
    ]);
    apply_table_style(&mut table);
    for index in 1..=3 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for patch in patches {
        table.add_row(vec![
            Cell::new(&patch.source).add_attribute(Attribute::Bold),
            Cell::new(patch.report.rows),
            Cell::new(patch.report.exact + patch.report.degraded),
            count_cell(patch.report.unmatched, Color::Yellow),
            Cell::new(patch.path.display()),
        ]);
    }
    println!("{table}");
}

pub fn print_location_fan_out(results: &[LocationFanOut]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("Matched rows"),
        header_cell("Output rows"),
        header_cell("File"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    for result in results {
        table.add_row(vec![
            Cell::new(&result.source).add_attribute(Attribute::Bold),
            Cell::new(result.matched_rows),
            Cell::new(result.output_rows),
            Cell::new(result.path.display()),
        ]);
    }
    println!("{table}");
}

fn print_unmatched(keys: &[UnmatchedKey]) {
    if keys.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Municipality code"),
        header_cell("Match"),
        header_cell("Records"),
        header_cell("First date"),
        header_cell("Last date"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for key in keys.iter().take(MAX_UNMATCHED_ROWS) {
        table.add_row(unmatched_row(key));
    }
    println!();
    println!("Municipality codes without an exact match:");
    println!("{table}");
    if let Some(rest) = remaining_line(keys.len()) {
        println!("{rest}");
    }
}

fn unmatched_row(key: &UnmatchedKey) -> Vec<Cell> {
    let stage = match key.stage {
        MatchStage::Degraded => Cell::new(key.stage).fg(Color::Yellow),
        _ => Cell::new(key.stage).fg(Color::Red),
    };
    vec![
        Cell::new(&key.key),
        stage,
        Cell::new(key.count),
        date_cell(key.first_date.as_deref()),
        date_cell(key.last_date.as_deref()),
    ]
}

fn remaining_line(total: usize) -> Option<String> {
    (total > MAX_UNMATCHED_ROWS)
        .then(|| format!("... and {} more", total - MAX_UNMATCHED_ROWS))
}

fn date_cell(date: Option<&str>) -> Cell {
    match date {
        Some(date) => Cell::new(date),
        None => dim_cell("-"),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(165);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
