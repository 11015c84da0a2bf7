//! Occupation (CBO) lookup construction.
//!
//! The lookup merges three code families into one file:
//! - pre-2002 three-digit codes, categorized by expanded subgroup and group
//!   ranges;
//! - CBO-94 five-digit codes, converted to their CBO-2002 equivalent;
//! - CBO-2002 six-digit codes, categorized by code prefix (4 digits -> family,
//!   3 -> subgroup, 2 -> principal subgroup, 1 -> group).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sus_model::codes::occupation;
use sus_model::{RecordTable, ReferenceTable};
use tracing::{info, warn};

use crate::csv_utils::{get_field, read_csv_rows};
use crate::error::{Result, StandardsError};
use crate::range::{CodeRange, CodeScheme};

const CBO94_COLUMN: &str = "CBO94";
const CBO2002_COLUMN: &str = "CBO2002";

/// Input files of the occupation lookup.
#[derive(Debug, Clone)]
pub struct OccupationSources {
    pub short_title: PathBuf,
    pub short_subgroup: PathBuf,
    pub short_group: PathBuf,
    pub cbo94_to_cbo2002: PathBuf,
    pub cbo_title: PathBuf,
    pub cbo_family: PathBuf,
    pub cbo_subgroup: PathBuf,
    pub cbo_principal_subgroup: PathBuf,
    pub cbo_group: PathBuf,
}

/// `(code, title)` pair of a classification file.
pub type CodeTitle = (String, String);

/// Title-case every word: first letter of each alphabetic run upper case,
/// the rest lower case.
pub fn title_case(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut in_word = false;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if in_word {
                output.extend(ch.to_lowercase());
            } else {
                output.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            output.push(ch);
            in_word = false;
        }
    }
    output
}

/// Expand `###-###` (or single `###`) code ranges into one row per code.
pub fn expand_code_ranges(rows: &[CodeTitle]) -> Result<Vec<CodeTitle>> {
    let mut expanded = Vec::new();
    for (range, title) in rows {
        for code in CodeRange::parse(range, CodeScheme::Numeric)?.codes() {
            expanded.push((code, title.clone()));
        }
    }
    Ok(expanded)
}

fn lookup_table() -> RecordTable {
    RecordTable::new(std::iter::once(occupation::CODE).chain(occupation::VALUE_COLUMNS))
}

fn titles_table(titles: &[CodeTitle]) -> RecordTable {
    let mut table = lookup_table();
    for (code, title) in titles {
        table.push_row(vec![code.clone(), title.clone()]);
    }
    table
}

/// Fill `column` with the title of the category whose code equals the first
/// `prefix_len` characters of each row's code.
///
/// Every row must match exactly one category.
pub fn add_category(
    table: &mut RecordTable,
    categories: &[CodeTitle],
    prefix_len: usize,
    column: &str,
) -> Result<()> {
    let mut by_code: HashMap<&str, Vec<&str>> = HashMap::new();
    for (code, title) in categories {
        by_code.entry(code.as_str()).or_default().push(title.as_str());
    }

    let code_idx = table.require_column(occupation::CODE, "occupation lookup")?;
    let mut values = Vec::with_capacity(table.row_count());
    for code in table.column_values(code_idx) {
        let prefix = code.get(..prefix_len).unwrap_or(code);
        match by_code.get(prefix).map(Vec::as_slice) {
            Some([title]) => values.push((*title).to_string()),
            other => {
                return Err(StandardsError::PrefixJoin {
                    column: column.to_string(),
                    code: code.to_string(),
                    matches: other.map_or(0, <[&str]>::len),
                });
            }
        }
    }
    table.set_column(column, values)?;
    Ok(())
}

/// Pre-2002 three-digit codes. Their subgroup ranges become the principal
/// subgroup column; group titles keep the text after the first `-`.
pub fn pre_2002_table(
    titles: &[CodeTitle],
    subgroups: &[CodeTitle],
    groups: &[CodeTitle],
) -> Result<RecordTable> {
    let groups: Vec<CodeTitle> = groups
        .iter()
        .map(|(code, title)| {
            let title = title.split('-').nth(1).unwrap_or("").trim().to_string();
            (code.clone(), title)
        })
        .collect();

    let mut table = titles_table(titles);
    add_category(
        &mut table,
        &expand_code_ranges(subgroups)?,
        3,
        occupation::PRINCIPAL_SUBGROUP,
    )?;
    add_category(&mut table, &expand_code_ranges(&groups)?, 3, occupation::GROUP)?;
    info!(codes = table.row_count(), "built pre-2002 occupation codes");
    Ok(table)
}

/// CBO-2002 six-digit codes categorized by prefix.
pub fn cbo2002_table(
    titles: &[CodeTitle],
    families: &[CodeTitle],
    subgroups: &[CodeTitle],
    principal_subgroups: &[CodeTitle],
    groups: &[CodeTitle],
) -> Result<RecordTable> {
    let title_cased = |rows: &[CodeTitle]| -> Vec<CodeTitle> {
        rows.iter()
            .map(|(code, title)| (code.clone(), title_case(title)))
            .collect()
    };

    let mut table = titles_table(titles);
    add_category(&mut table, families, 4, occupation::FAMILY)?;
    add_category(&mut table, &title_cased(subgroups), 3, occupation::SUBGROUP)?;
    add_category(
        &mut table,
        &title_cased(principal_subgroups),
        2,
        occupation::PRINCIPAL_SUBGROUP,
    )?;
    add_category(&mut table, &title_cased(groups), 1, occupation::GROUP)?;
    info!(codes = table.row_count(), "built CBO-2002 occupation codes");
    Ok(table)
}

/// CBO-94 codes carrying the values of their CBO-2002 equivalent. Conversions
/// to an unknown CBO-2002 code are dropped.
pub fn cbo94_table(conversions: &[CodeTitle], cbo2002: &RecordTable) -> Result<RecordTable> {
    let code_idx = cbo2002.require_column(occupation::CODE, "CBO-2002 lookup")?;
    let mut by_code: HashMap<&str, Vec<&Vec<String>>> = HashMap::new();
    for row in &cbo2002.rows {
        by_code.entry(row[code_idx].as_str()).or_default().push(row);
    }

    let mut table = RecordTable::new(cbo2002.headers.iter().cloned());
    let mut dropped = 0usize;
    for (cbo94, cbo2002_code) in conversions {
        let Some(matches) = by_code.get(cbo2002_code.as_str()) else {
            dropped += 1;
            continue;
        };
        for row in matches {
            let mut converted = (*row).clone();
            converted[code_idx] = cbo94.clone();
            table.push_row(converted);
        }
    }
    if dropped > 0 {
        warn!(dropped, "CBO-94 conversions without a CBO-2002 code");
    }
    info!(codes = table.row_count(), "built CBO-94 conversion codes");
    Ok(table)
}

fn read_code_titles(path: &Path) -> Result<Vec<CodeTitle>> {
    Ok(read_csv_rows(path, b',', &[occupation::CODE, occupation::TITLE])?
        .iter()
        .map(|row| {
            (
                get_field(row, occupation::CODE).to_string(),
                get_field(row, occupation::TITLE).to_string(),
            )
        })
        .collect())
}

/// Build the occupation lookup: pre-2002 codes, then CBO-94 conversions, then
/// CBO-2002 codes.
pub fn build_occupation_lookup(sources: &OccupationSources) -> Result<RecordTable> {
    let mut lookup = pre_2002_table(
        &read_code_titles(&sources.short_title)?,
        &read_code_titles(&sources.short_subgroup)?,
        &read_code_titles(&sources.short_group)?,
    )?;

    let cbo2002 = cbo2002_table(
        &read_code_titles(&sources.cbo_title)?,
        &read_code_titles(&sources.cbo_family)?,
        &read_code_titles(&sources.cbo_subgroup)?,
        &read_code_titles(&sources.cbo_principal_subgroup)?,
        &read_code_titles(&sources.cbo_group)?,
    )?;

    let conversions: Vec<CodeTitle> =
        read_csv_rows(&sources.cbo94_to_cbo2002, b';', &[CBO94_COLUMN, CBO2002_COLUMN])?
            .iter()
            .map(|row| {
                (
                    get_field(row, CBO94_COLUMN).to_string(),
                    get_field(row, CBO2002_COLUMN).to_string(),
                )
            })
            .collect();

    lookup.append(cbo94_table(&conversions, &cbo2002)?);
    lookup.append(cbo2002);
    Ok(lookup)
}

/// Load an occupation lookup file keyed by `CODIGO`.
pub fn load_occupation_lookup(path: &Path) -> Result<ReferenceTable> {
    let mut required = vec![occupation::CODE];
    required.extend(occupation::VALUE_COLUMNS);
    let rows = read_csv_rows(path, b',', &required)?;

    let mut builder = ReferenceTable::builder(occupation::VALUE_COLUMNS);
    for row in &rows {
        let values = occupation::VALUE_COLUMNS
            .iter()
            .map(|column| get_field(row, column).to_string())
            .collect();
        builder.insert(get_field(row, occupation::CODE), "", values)?;
    }
    let lookup = builder.build();
    if lookup.duplicate_keys() > 0 {
        warn!(
            duplicates = lookup.duplicate_keys(),
            path = %path.display(),
            "duplicate occupation codes, keeping the first"
        );
    }
    Ok(lookup)
}
