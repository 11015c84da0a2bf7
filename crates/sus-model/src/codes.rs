//! Column names of the classification lookup files.
//!
//! The lookup builders write these files and the converters read them back, so
//! both sides share the names from here.

/// Deepest category nesting a classification code can have.
pub const MAX_CATEGORY_LEVELS: usize = 4;

/// Cause of death (CID-9 / CID-10) lookup.
pub mod cause_of_death {
    pub const ID: &str = "cid_id";
    pub const TITLE: &str = "cause_of_death_title";
    pub const PARENT: &str = "cause_of_death_parent";
    pub const CATEGORY_1: &str = "cause_of_death_category1";
    pub const CATEGORY_2: &str = "cause_of_death_category2";
    pub const CATEGORY_3: &str = "cause_of_death_category3";
    pub const CATEGORY_4: &str = "cause_of_death_category4";

    pub const CATEGORIES: [&str; super::MAX_CATEGORY_LEVELS] =
        [CATEGORY_1, CATEGORY_2, CATEGORY_3, CATEGORY_4];

    /// Value columns, in file order, after the id column.
    pub const VALUE_COLUMNS: [&str; 6] =
        [TITLE, PARENT, CATEGORY_1, CATEGORY_2, CATEGORY_3, CATEGORY_4];
}

/// Occupation (CBO) lookup.
pub mod occupation {
    pub const CODE: &str = "CODIGO";
    pub const TITLE: &str = "TITULO";
    pub const FAMILY: &str = "family";
    pub const SUBGROUP: &str = "subgroup";
    pub const PRINCIPAL_SUBGROUP: &str = "principal_subgroup";
    pub const GROUP: &str = "group";

    /// Value columns, in file order, after the code column.
    pub const VALUE_COLUMNS: [&str; 5] = [TITLE, FAMILY, SUBGROUP, PRINCIPAL_SUBGROUP, GROUP];

    /// Label used when a non-empty occupation code matches nothing.
    pub const UNKNOWN_OCCUPATION: &str = "Ocupação desconhecida";
}

/// Municipality reference file.
pub mod municipality {
    pub const CODE_SHORT: &str = "MunicipalityCodeShort";
    pub const CODE_LONG: &str = "MunicipalityCodeLong";
}

/// One row of a classification lookup: a code with its title, direct parent
/// and up to [`MAX_CATEGORY_LEVELS`] enclosing categories (broadest first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeEntry {
    pub code: String,
    pub title: String,
    pub parent: String,
    pub categories: Vec<String>,
}

impl CodeEntry {
    /// Category at `level` (1-based), empty when the code is not that deep.
    pub fn category(&self, level: usize) -> &str {
        level
            .checked_sub(1)
            .and_then(|idx| self.categories.get(idx))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Values in [`cause_of_death::VALUE_COLUMNS`] order.
    pub fn to_cause_of_death_values(&self) -> Vec<String> {
        let mut values = vec![self.title.clone(), self.parent.clone()];
        for level in 1..=MAX_CATEGORY_LEVELS {
            values.push(self.category(level).to_string());
        }
        values
    }
}
