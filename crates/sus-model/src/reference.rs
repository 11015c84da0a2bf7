//! Immutable reference tables keyed by a short and/or long code.
//!
//! Brazilian municipality codes exist in a 6-digit ("short") and a 7-digit
//! ("long", with check digit) form. Classification lookups only use the short
//! key slot.

use std::collections::HashMap;

use crate::error::{Result, SusError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    short: HashMap<String, usize>,
    long: HashMap<String, usize>,
    duplicate_keys: usize,
}

impl ReferenceTable {
    pub fn builder<I, S>(columns: I) -> ReferenceTableBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ReferenceTableBuilder {
            table: ReferenceTable {
                columns: columns.into_iter().map(Into::into).collect(),
                rows: Vec::new(),
                short: HashMap::new(),
                long: HashMap::new(),
                duplicate_keys: 0,
            },
        }
    }

    /// Names of the value columns every match contributes.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keys seen more than once while building; the first row wins.
    pub fn duplicate_keys(&self) -> usize {
        self.duplicate_keys
    }

    pub fn get_short(&self, key: &str) -> Option<&[String]> {
        self.short.get(key).map(|&idx| self.rows[idx].as_slice())
    }

    pub fn get_long(&self, key: &str) -> Option<&[String]> {
        self.long.get(key).map(|&idx| self.rows[idx].as_slice())
    }

    /// Short key first, then long key.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.get_short(key).or_else(|| self.get_long(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.short.contains_key(key) || self.long.contains_key(key)
    }

    /// Value of `column` in a row returned by one of the getters.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }
}

#[derive(Debug)]
pub struct ReferenceTableBuilder {
    table: ReferenceTable,
}

impl ReferenceTableBuilder {
    /// Add a row. At least one of the keys must be non-empty.
    pub fn insert(&mut self, short: &str, long: &str, mut values: Vec<String>) -> Result<()> {
        let short = short.trim();
        let long = long.trim();
        if short.is_empty() && long.is_empty() {
            return Err(SusError::EmptyReferenceKey {
                row: self.table.rows.len(),
            });
        }
        values.resize(self.table.columns.len(), String::new());
        let idx = self.table.rows.len();
        self.table.rows.push(values);
        for (key, index) in [(short, &mut self.table.short), (long, &mut self.table.long)] {
            if key.is_empty() {
                continue;
            }
            if index.contains_key(key) {
                self.table.duplicate_keys += 1;
            } else {
                index.insert(key.to_string(), idx);
            }
        }
        Ok(())
    }

    pub fn build(self) -> ReferenceTable {
        self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ReferenceTable {
        let mut builder = ReferenceTable::builder(["StateName", "MunicipalityName"]);
        builder
            .insert("110001", "1100015", vec!["Rondônia".into(), "Alta Floresta D'Oeste".into()])
            .expect("insert");
        builder
            .insert("", "5300108", vec!["Distrito Federal".into(), "Brasília".into()])
            .expect("insert");
        builder.build()
    }

    #[test]
    fn short_then_long() {
        let table = sample();
        assert_eq!(table.get("110001").map(|row| row[1].as_str()), Some("Alta Floresta D'Oeste"));
        assert_eq!(table.get("5300108").map(|row| row[1].as_str()), Some("Brasília"));
        assert!(table.get("530010").is_none());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn empty_keys_rejected() {
        let mut builder = ReferenceTable::builder(["A"]);
        let err = builder.insert(" ", "", vec![]).unwrap_err();
        assert!(matches!(err, SusError::EmptyReferenceKey { row: 0 }));
    }

    #[test]
    fn duplicates_keep_first() {
        let mut builder = ReferenceTable::builder(["A"]);
        builder.insert("1", "", vec!["first".into()]).expect("insert");
        builder.insert("1", "", vec!["second".into()]).expect("insert");
        let table = builder.build();
        assert_eq!(table.get("1").map(|row| row[0].as_str()), Some("first"));
        assert_eq!(table.duplicate_keys(), 1);
    }
}
