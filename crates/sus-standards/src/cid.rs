//! Cause of death (CID-9 / CID-10) lookup construction.
//!
//! Both classifications arrive as an ordered list of rows mixing category
//! ranges, parent codes and leaf codes. Parent rows precede their children, so
//! a single pass assigns each leaf the last parent seen.
//!
//! - CID-9: codes are four digits (`0010`), parents end in `X` (`001X`) and a
//!   single level of numeric ranges (`001-139`) gives category 1.
//! - CID-10: each row reads `(ID) title`; codes are a letter and three digits
//!   once the `.` is removed (`A00.0` -> `A000`), parents have no `.` and up to
//!   four nested alphanumeric ranges give the categories.

use std::collections::HashMap;
use std::path::Path;

use sus_model::codes::cause_of_death;
use sus_model::{CodeEntry, RecordTable, ReferenceTable};
use tracing::{info, warn};

use crate::csv_utils::{get_field, read_csv_rows};
use crate::error::{Result, StandardsError};
use crate::range::{CategoryLookup, CodeScheme, expand_titled};

const CID10_RAW_COLUMN: &str = "cid";
const CID9_PARENT_MARKER: char = 'X';
const CATEGORY_CODE_LEN: usize = 3;

/// Raw classification row: an id (code, parent code or range) and its title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCode {
    pub id: String,
    pub title: String,
}

impl RawCode {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }

    fn is_range(&self) -> bool {
        self.id.contains('-')
    }
}

/// A code with its resolved title and parent label, before categories.
#[derive(Debug)]
struct ParentedCode {
    id: String,
    title: String,
    parent: String,
}

/// Assign parents to codes.
///
/// Parent rows get an empty title. A leaf title used more than once is
/// prefixed with its parent title, unless the duplicates share the parent.
/// Titles and parents finally carry their code (`A00.0: ...`, `A00: Cólera`).
fn assign_parents<F>(rows: &[RawCode], is_parent: F) -> Vec<ParentedCode>
where
    F: Fn(&str) -> bool,
{
    struct Pending<'a> {
        id: &'a str,
        title: Option<String>,
        parent_title: Option<&'a str>,
        parent_label: Option<String>,
    }

    let mut pending = Vec::with_capacity(rows.len());
    let mut parent_title: Option<&str> = None;
    let mut parent_label: Option<String> = None;
    for row in rows {
        let title = if is_parent(&row.id) {
            parent_title = Some(row.title.as_str());
            parent_label = Some(format!("{}: {}", row.id, row.title));
            None
        } else {
            Some(row.title.clone())
        };
        pending.push(Pending {
            id: &row.id,
            title,
            parent_title,
            parent_label: parent_label.clone(),
        });
    }

    let mut title_counts: HashMap<String, usize> = HashMap::new();
    let mut pair_counts: HashMap<(String, Option<&str>), usize> = HashMap::new();
    for code in &pending {
        if let Some(title) = &code.title {
            *title_counts.entry(title.clone()).or_default() += 1;
            *pair_counts
                .entry((title.clone(), code.parent_title))
                .or_default() += 1;
        }
    }

    pending
        .into_iter()
        .map(|code| {
            let title = code.title.map(|title| {
                let repeated = title_counts.get(&title).copied().unwrap_or(0) > 1;
                let shared_parent = pair_counts
                    .get(&(title.clone(), code.parent_title))
                    .copied()
                    .unwrap_or(0)
                    > 1;
                let title = match code.parent_title {
                    Some(parent) if repeated && !shared_parent => format!("{parent}: {title}"),
                    _ => title,
                };
                format!("{}: {title}", code.id)
            });
            ParentedCode {
                id: code.id.to_string(),
                title: title.unwrap_or_default(),
                parent: code.parent_label.unwrap_or_default(),
            }
        })
        .collect()
}

/// Build CID-9 entries from `(cid_id, title)` rows.
pub fn cid9_entries(rows: &[RawCode]) -> Result<Vec<CodeEntry>> {
    let categories = expand_titled(
        rows.iter()
            .filter(|row| row.is_range())
            .map(|row| (row.id.as_str(), row.title.as_str())),
        CodeScheme::Numeric,
    )?;

    let codes: Vec<RawCode> = rows
        .iter()
        .filter(|row| !row.is_range())
        .map(|row| RawCode::new(row.id.trim(), row.title.trim()))
        .collect();

    let mut uncategorized = 0usize;
    let entries = assign_parents(&codes, |id| id.contains(CID9_PARENT_MARKER))
        .into_iter()
        .map(|code| {
            let prefix: String = code.id.chars().take(CATEGORY_CODE_LEN).collect();
            let category = categories.get(&prefix).cloned().unwrap_or_else(|| {
                uncategorized += 1;
                prefix
            });
            CodeEntry {
                categories: vec![category],
                code: code.id,
                title: code.title,
                parent: code.parent,
            }
        })
        .collect::<Vec<_>>();

    if uncategorized > 0 {
        warn!(
            uncategorized,
            "CID-9 codes outside every category range, keeping their prefix as category"
        );
    }
    info!(codes = entries.len(), "built CID-9 entries");
    Ok(entries)
}

/// Split a raw CID-10 row `(A00.0) Cólera ...` into id and title.
pub fn split_cid10_row(raw: &str) -> Result<RawCode> {
    let (id, title) = raw
        .split_once(')')
        .ok_or_else(|| StandardsError::invalid_code(raw, "expected \"(ID) title\""))?;
    Ok(RawCode::new(id.replace('(', "").trim(), title.trim()))
}

/// Build CID-10 entries from `(ID) title` rows.
///
/// Every code must fall into at least one category range.
pub fn cid10_entries(raw_rows: &[String]) -> Result<Vec<CodeEntry>> {
    let rows = raw_rows
        .iter()
        .map(|raw| split_cid10_row(raw))
        .collect::<Result<Vec<_>>>()?;

    let lookup = CategoryLookup::build(
        rows.iter()
            .filter(|row| row.is_range())
            .map(|row| (row.id.as_str(), row.title.as_str())),
        CodeScheme::Alphanumeric,
    )?;

    let codes: Vec<RawCode> = rows.into_iter().filter(|row| !row.is_range()).collect();
    let entries = assign_parents(&codes, |id| !id.contains('.'))
        .into_iter()
        .map(|code| {
            let id = code.id.replace('.', "");
            let categories = id
                .get(..CATEGORY_CODE_LEN)
                .and_then(|prefix| lookup.categories(prefix))
                .ok_or_else(|| StandardsError::Uncategorized { code: id.clone() })?;
            Ok(CodeEntry {
                categories: categories.to_vec(),
                code: id,
                title: code.title,
                parent: code.parent,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    info!(
        codes = entries.len(),
        categorized = lookup.len(),
        "built CID-10 entries"
    );
    Ok(entries)
}

/// Build the combined lookup from the raw CID-9 and CID-10 files.
pub fn build_cause_of_death_lookup(cid9: &Path, cid10: &Path) -> Result<Vec<CodeEntry>> {
    let cid9_rows: Vec<RawCode> =
        read_csv_rows(cid9, b',', &[cause_of_death::ID, cause_of_death::TITLE])?
            .iter()
            .map(|row| {
                RawCode::new(
                    get_field(row, cause_of_death::ID),
                    get_field(row, cause_of_death::TITLE),
                )
            })
            .collect();
    let cid10_rows: Vec<String> = read_csv_rows(cid10, b',', &[CID10_RAW_COLUMN])?
        .iter()
        .map(|row| get_field(row, CID10_RAW_COLUMN).to_string())
        .collect();

    let mut entries = cid9_entries(&cid9_rows)?;
    entries.extend(cid10_entries(&cid10_rows)?);
    Ok(entries)
}

/// Lay entries out as the lookup file: `cid_id` then the value columns.
pub fn cause_of_death_table(entries: &[CodeEntry]) -> RecordTable {
    let mut table = RecordTable::new(
        std::iter::once(cause_of_death::ID).chain(cause_of_death::VALUE_COLUMNS),
    );
    for entry in entries {
        let mut row = vec![entry.code.clone()];
        row.extend(entry.to_cause_of_death_values());
        table.push_row(row);
    }
    table
}

/// Load a lookup file written by [`cause_of_death_table`], keyed by `cid_id`.
pub fn load_cause_of_death_lookup(path: &Path) -> Result<ReferenceTable> {
    let mut required = vec![cause_of_death::ID];
    required.extend(cause_of_death::VALUE_COLUMNS);
    let rows = read_csv_rows(path, b',', &required)?;

    let mut builder = ReferenceTable::builder(cause_of_death::VALUE_COLUMNS);
    for row in &rows {
        let values = cause_of_death::VALUE_COLUMNS
            .iter()
            .map(|column| get_field(row, column).to_string())
            .collect();
        builder.insert(get_field(row, cause_of_death::ID), "", values)?;
    }
    let lookup = builder.build();
    if lookup.duplicate_keys() > 0 {
        warn!(
            duplicates = lookup.duplicate_keys(),
            path = %path.display(),
            "duplicate cause of death codes, keeping the first"
        );
    }
    Ok(lookup)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cid9_parents_and_duplicate_titles() {
        let rows = vec![
            RawCode::new("001-139", "Doenças infecciosas e parasitárias"),
            RawCode::new("001X", "Cólera"),
            RawCode::new("0010", "Devida a Vibrio cholerae"),
            RawCode::new("0019", "Não especificada"),
            RawCode::new("002X", "Febre tifóide"),
            RawCode::new("0029", "Não especificada"),
        ];
        let entries = cid9_entries(&rows).expect("cid9");
        assert_eq!(entries.len(), 5);

        let parent = &entries[0];
        assert_eq!(parent.code, "001X");
        assert_eq!(parent.title, "");
        assert_eq!(parent.parent, "001X: Cólera");
        assert_eq!(
            parent.category(1),
            "001-139: Doenças infecciosas e parasitárias"
        );

        assert_eq!(entries[1].title, "0010: Devida a Vibrio cholerae");
        assert_eq!(entries[2].title, "0019: Cólera: Não especificada");
        assert_eq!(entries[4].title, "0029: Febre tifóide: Não especificada");
        assert_eq!(entries[4].parent, "002X: Febre tifóide");
    }

    #[test]
    fn uncategorized_cid9_code_keeps_its_prefix() {
        let rows = vec![
            RawCode::new("001-139", "Doenças infecciosas e parasitárias"),
            RawCode::new("140X", "Neoplasma maligno do lábio"),
            RawCode::new("1401", "Lábio inferior"),
        ];
        let entries = cid9_entries(&rows).expect("cid9");
        assert_eq!(entries[0].category(1), "140");
        assert_eq!(entries[1].category(1), "140");
        assert_eq!(entries[1].category(2), "");
    }

    #[test]
    fn same_title_under_same_parent_is_kept() {
        let rows = vec![
            RawCode::new("A00", "Cólera"),
            RawCode::new("A00.1", "Outra"),
            RawCode::new("A00.2", "Outra"),
        ];
        let parented = assign_parents(&rows, |id| !id.contains('.'));
        assert_eq!(parented[1].title, "A00.1: Outra");
        assert_eq!(parented[2].title, "A00.2: Outra");
    }

    #[test]
    fn cid10_rows_get_nested_categories() {
        let raw: Vec<String> = [
            "(A00-B99) Algumas doenças infecciosas e parasitárias",
            "(A00-A09) Doenças infecciosas intestinais",
            "(A00) Cólera",
            "(A00.0) Cólera devida a Vibrio cholerae 01 biótipo cholerae",
            "(A00.9) Cólera não especificada",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        let entries = cid10_entries(&raw).expect("cid10");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].code, "A00");
        assert_eq!(entries[0].title, "");
        assert_eq!(entries[1].code, "A000");
        assert_eq!(
            entries[1].title,
            "A00.0: Cólera devida a Vibrio cholerae 01 biótipo cholerae"
        );
        assert_eq!(entries[1].parent, "A00: Cólera");
        assert_eq!(
            entries[2].categories,
            vec![
                "A00-B99: Algumas doenças infecciosas e parasitárias",
                "A00-A09: Doenças infecciosas intestinais",
            ]
        );
    }

    #[test]
    fn cid10_code_without_category_is_fatal() {
        let raw = vec!["(A00-A09) Intestinais".to_string(), "(B10) Outra".to_string()];
        let err = cid10_entries(&raw).unwrap_err();
        assert!(matches!(err, StandardsError::Uncategorized { ref code } if code == "B10"));
    }

    #[test]
    fn malformed_cid10_row() {
        assert!(split_cid10_row("A00 Cólera").is_err());
    }
}
