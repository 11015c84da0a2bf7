//! Bounded-memory accumulation of input files.
//!
//! Files are added to the open batch until the next one would cross the row or
//! byte threshold. That file then starts a new batch and the full one is handed
//! back for processing. A single file larger than the limits still forms a
//! batch of its own.

use std::path::PathBuf;

use sus_model::{BatchLimits, RecordTable};
use tracing::debug;

#[derive(Debug)]
pub struct Batch {
    /// Zero-based position of this batch in the run.
    pub index: usize,
    pub files: Vec<PathBuf>,
    pub table: RecordTable,
    /// On-disk size of the files in this batch.
    pub bytes: u64,
}

impl Batch {
    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }
}

#[derive(Debug)]
pub struct Batcher {
    limits: BatchLimits,
    next_index: usize,
    open: Option<Batch>,
}

impl Batcher {
    pub fn new(limits: BatchLimits) -> Self {
        Self {
            limits,
            next_index: 0,
            open: None,
        }
    }

    /// Add a loaded file, returning the previous batch when this file does not
    /// fit into it.
    pub fn push(&mut self, path: PathBuf, table: RecordTable, bytes: u64) -> Option<Batch> {
        if let Some(open) = self.open.as_mut()
            && self
                .limits
                .fits(open.row_count(), open.bytes, table.row_count(), bytes)
        {
            open.table.append(table);
            open.files.push(path);
            open.bytes += bytes;
            return None;
        }

        let full = self.open.take();
        if let Some(batch) = &full {
            debug!(
                batch = batch.index,
                rows = batch.row_count(),
                files = batch.files.len(),
                "batch full"
            );
        }
        self.open = Some(Batch {
            index: self.next_index,
            files: vec![path],
            table,
            bytes,
        });
        self.next_index += 1;
        full
    }

    /// Close the run, returning the last open batch if any.
    pub fn finish(self) -> Option<Batch> {
        self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: usize) -> RecordTable {
        let mut table = RecordTable::new(["A"]);
        for idx in 0..rows {
            table.push_row(vec![idx.to_string()]);
        }
        table
    }

    #[test]
    fn flushes_before_overflow() {
        let mut batcher = Batcher::new(BatchLimits {
            max_rows: 5,
            max_bytes: None,
        });
        assert!(batcher.push("a.csv".into(), table(2), 10).is_none());
        assert!(batcher.push("b.csv".into(), table(3), 10).is_none());

        let first = batcher.push("c.csv".into(), table(1), 10).expect("full batch");
        assert_eq!(first.index, 0);
        assert_eq!(first.row_count(), 5);
        assert_eq!(first.files.len(), 2);
        assert_eq!(first.bytes, 20);

        let last = batcher.finish().expect("open batch");
        assert_eq!(last.index, 1);
        assert_eq!(last.row_count(), 1);
    }

    #[test]
    fn oversized_file_is_its_own_batch() {
        let mut batcher = Batcher::new(BatchLimits {
            max_rows: 2,
            max_bytes: None,
        });
        assert!(batcher.push("big.csv".into(), table(10), 1).is_none());
        let big = batcher.push("small.csv".into(), table(1), 1).expect("flush");
        assert_eq!(big.row_count(), 10);
    }

    #[test]
    fn byte_limit_applies() {
        let mut batcher = Batcher::new(BatchLimits {
            max_rows: 100,
            max_bytes: Some(15),
        });
        assert!(batcher.push("a.csv".into(), table(1), 10).is_none());
        assert!(batcher.push("b.csv".into(), table(1), 10).is_some());
    }
}
