//! Explicit per-source column schemas.
//!
//! A schema is checked when a table is loaded: aliases are resolved first, then
//! required columns must exist and optional columns are added empty.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SusError};
use crate::table::RecordTable;

/// Character encoding of a raw input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// ISO-8859-1 / Windows-1252, used by some older DATASUS exports.
    Latin1,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSchema {
    pub name: String,
    pub delimiter: u8,
    pub encoding: TextEncoding,
    /// Columns that must be present once aliases are applied.
    pub required: Vec<String>,
    /// Columns added with empty values when a file does not carry them.
    pub optional: Vec<String>,
    /// Historical column name -> canonical column name.
    pub aliases: BTreeMap<String, String>,
}

impl SourceSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            delimiter: b';',
            encoding: TextEncoding::Utf8,
            required: Vec::new(),
            optional: Vec::new(),
            aliases: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    #[must_use]
    pub fn require<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(columns.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn optional<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optional.extend(columns.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn alias(mut self, historical: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.aliases.insert(historical.into(), canonical.into());
        self
    }

    /// Whether a raw column should be kept when reading a file.
    pub fn wants(&self, column: &str) -> bool {
        self.required.iter().any(|c| c == column)
            || self.optional.iter().any(|c| c == column)
            || self.aliases.contains_key(column)
    }

    /// Resolve aliases, check required columns and add absent optional ones.
    pub fn conform(&self, table: &mut RecordTable) -> Result<()> {
        for (historical, canonical) in &self.aliases {
            if !table.has_column(canonical) {
                table.rename_columns([(historical.as_str(), canonical.as_str())]);
            }
        }
        for column in &self.required {
            if !table.has_column(column) {
                return Err(SusError::missing_column(&self.name, column));
            }
        }
        for column in &self.optional {
            table.ensure_column(column);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> SourceSchema {
        SourceSchema::new("sim")
            .require(["CAUSABAS"])
            .optional(["SEXO"])
            .alias("MUNIRES", "CODMUNRES")
            .optional(["CODMUNRES"])
    }

    #[test]
    fn conform_applies_aliases_and_fills_optional() {
        let mut table = RecordTable::from_literal(&["CAUSABAS", "MUNIRES"], &[&["A00", "110001"]]);
        schema().conform(&mut table).expect("conform");
        assert_eq!(table.headers, vec!["CAUSABAS", "CODMUNRES", "SEXO"]);
        assert_eq!(table.rows[0], vec!["A00", "110001", ""]);
    }

    #[test]
    fn conform_rejects_missing_required() {
        let mut table = RecordTable::from_literal(&["SEXO"], &[&["1"]]);
        let err = schema().conform(&mut table).unwrap_err();
        assert!(matches!(err, SusError::MissingColumn { ref column, .. } if column == "CAUSABAS"));
    }

    #[test]
    fn wants_covers_aliases() {
        let schema = schema();
        assert!(schema.wants("MUNIRES"));
        assert!(schema.wants("CAUSABAS"));
        assert!(!schema.wants("OTHER"));
    }
}
