//! Station registry with normalized-key lookups
//!
//! Loads the station metadata table, derives the normalized key of every
//! sampling point and keeps the first record seen for each key. The registry
//! is built once per run and is read-only afterwards.

use crate::models::StationRecord;
use std::collections::HashMap;
use std::path::PathBuf;

pub mod loader;
pub mod query;

#[cfg(test)]
pub mod tests;

pub use query::TargetKeySet;

/// Station metadata indexed by normalized key
#[derive(Debug, Clone)]
pub struct StationRegistry {
    /// Deduplicated records in file order
    pub(crate) records: Vec<StationRecord>,

    /// Normalized key to position in `records`
    pub(crate) index: HashMap<String, usize>,

    /// Path the registry was loaded from
    pub(crate) source_path: PathBuf,

    /// Rows read from the metadata table
    pub(crate) rows_read: usize,

    /// Rows dropped because an earlier row had the same key
    pub(crate) duplicates_dropped: usize,

    /// Rows without a sampling point identifier
    pub(crate) rows_without_identifier: usize,
}

impl StationRegistry {
    /// Build a registry from records already in file order; the first record
    /// for each normalized key wins
    pub fn from_records(source_path: PathBuf, rows: Vec<StationRecord>) -> Self {
        let rows_read = rows.len();
        let mut records = Vec::with_capacity(rows.len());
        let mut index = HashMap::with_capacity(rows.len());

        for record in rows {
            if index.contains_key(&record.normalized_key) {
                continue;
            }
            index.insert(record.normalized_key.clone(), records.len());
            records.push(record);
        }

        Self {
            duplicates_dropped: rows_read - records.len(),
            records,
            index,
            source_path,
            rows_read,
            rows_without_identifier: 0,
        }
    }

    /// Look up a station by normalized key
    pub fn get(&self, key: &str) -> Option<&StationRecord> {
        self.index
            .get(key)
            .and_then(|&position| self.records.get(position))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn records(&self) -> &[StationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn source_path(&self) -> &PathBuf {
        &self.source_path
    }

    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    pub fn rows_without_identifier(&self) -> usize {
        self.rows_without_identifier
    }

    /// Records whose coordinates are missing or not numeric
    pub fn unlocatable_count(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.coordinates().is_none())
            .count()
    }
}
