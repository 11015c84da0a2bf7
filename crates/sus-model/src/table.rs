//! In-memory table of text records.
//!
//! Every value is kept as a `String` so no type inference ever happens on the
//! raw data. A record is identified only by its position in the table.

use crate::error::{Result, SusError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RecordTable {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a table from borrowed literals. Rows shorter than the header are
    /// padded with empty values.
    pub fn from_literal(headers: &[&str], rows: &[&[&str]]) -> Self {
        let mut table = Self::new(headers.iter().copied());
        for row in rows {
            table.push_row(row.iter().map(|value| (*value).to_string()).collect());
        }
        table
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Index of `name`, or [`SusError::MissingColumn`] naming `source_name`.
    pub fn require_column(&self, name: &str, source_name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| SusError::missing_column(source_name, name))
    }

    /// Index of `name`, appending an empty column when it does not exist yet.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.headers.len() - 1
    }

    /// Replace (or create) a column with the given values.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) -> Result<usize> {
        SusError::ensure_row_count(&format!("set column {name}"), self.rows.len(), values.len())?;
        let idx = self.ensure_column(name);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
        Ok(idx)
    }

    /// Fill a column with the same value on every row.
    pub fn fill_column(&mut self, name: &str, value: &str) -> usize {
        let idx = self.ensure_column(name);
        for row in &mut self.rows {
            row[idx] = value.to_string();
        }
        idx
    }

    pub fn value(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(col).map(String::as_str).unwrap_or(""))
    }

    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    /// Rename columns in place; names not present are ignored.
    pub fn rename_columns<'a, I>(&mut self, renames: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (from, to) in renames {
            if let Some(idx) = self.column_index(from) {
                self.headers[idx] = to.to_string();
            }
        }
    }

    pub fn drop_columns(&mut self, names: &[&str]) {
        let keep: Vec<bool> = self
            .headers
            .iter()
            .map(|header| !names.contains(&header.as_str()))
            .collect();
        if keep.iter().all(|flag| *flag) {
            return;
        }
        self.headers = retain_flags(std::mem::take(&mut self.headers), &keep);
        for row in &mut self.rows {
            *row = retain_flags(std::mem::take(row), &keep);
        }
    }

    /// Keep rows matching `keep`, returning the number of rows dropped.
    pub fn retain_rows<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&[String]) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(|row| keep(row));
        before - self.rows.len()
    }

    /// Append the rows of `other`, extending the column set with any column
    /// only `other` has. Missing cells become empty on both sides.
    pub fn append(&mut self, other: RecordTable) {
        let mapping: Vec<usize> = other
            .headers
            .iter()
            .map(|header| self.ensure_column(header))
            .collect();
        let width = self.headers.len();
        for source in other.rows {
            let mut row = vec![String::new(); width];
            for (value, &target) in source.into_iter().zip(&mapping) {
                row[target] = value;
            }
            self.rows.push(row);
        }
    }

    /// Project the table onto `columns` in that order.
    pub fn select(&self, columns: &[String], source_name: &str) -> Result<RecordTable> {
        let indexes = columns
            .iter()
            .map(|column| self.require_column(column, source_name))
            .collect::<Result<Vec<_>>>()?;
        let rows = self
            .rows
            .iter()
            .map(|row| indexes.iter().map(|&idx| row[idx].clone()).collect())
            .collect();
        Ok(RecordTable {
            headers: columns.to_vec(),
            rows,
        })
    }
}

fn retain_flags(values: Vec<String>, keep: &[bool]) -> Vec<String> {
    values
        .into_iter()
        .zip(keep)
        .filter_map(|(value, flag)| flag.then_some(value))
        .collect()
}
