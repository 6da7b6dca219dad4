//! Structure exploration of measurement files
//!
//! Reports shape, schema and identifier samples of the first few parquet
//! files of a directory, to see how sampling-point identifiers are encoded
//! before running an extraction.

use crate::constants::{INSPECT_DISTINCT_VALUES, INSPECT_KEY_EXAMPLES, columns};
use crate::error::{ExtractError, Result};
use crate::frame::{has_column, read_parquet, text_values};
use crate::normalizer::IdentifierNormalizer;
use crate::processor::discovery::is_measurement_file;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Columns whose distinct values are sampled
const KEY_COLUMNS: [&str; 3] = [
    columns::SAMPLING_POINT,
    columns::AIR_QUALITY_STATION,
    columns::POLLUTANT,
];

#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileInspection {
    pub path: PathBuf,
    pub rows: usize,
    pub columns: Vec<ColumnInfo>,
    /// First distinct values of each key column present
    pub distinct_values: Vec<(String, Vec<String>)>,
    /// First identifiers with their normalized keys
    pub key_examples: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize)]
pub enum InspectEntry {
    Inspected(FileInspection),
    Unreadable { path: PathBuf, reason: String },
}

/// Summary of one inspect run
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub directory: PathBuf,
    pub files_found: usize,
    pub entries: Vec<InspectEntry>,
}

/// List measurement files under `dir`, sorted by path
pub fn list_measurement_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ExtractError::MissingDirectory {
            path: dir.to_path_buf(),
        });
    }

    let walker = WalkDir::new(dir).min_depth(1).sort_by_file_name();
    let walker = if recursive { walker } else { walker.max_depth(1) };

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| ExtractError::Io(e.into()))?;
        if entry.file_type().is_file() && is_measurement_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Inspect the first `sample` measurement files of `dir`
pub fn inspect_directory(
    dir: &Path,
    sample: usize,
    recursive: bool,
    normalizer: &IdentifierNormalizer,
) -> Result<InspectReport> {
    let files = list_measurement_files(dir, recursive)?;
    let entries = files
        .iter()
        .take(sample)
        .map(|path| match inspect_file(path, normalizer) {
            Ok(inspection) => InspectEntry::Inspected(inspection),
            Err(e) => InspectEntry::Unreadable {
                path: path.clone(),
                reason: e.to_string(),
            },
        })
        .collect();

    Ok(InspectReport {
        directory: dir.to_path_buf(),
        files_found: files.len(),
        entries,
    })
}

pub fn inspect_file(path: &Path, normalizer: &IdentifierNormalizer) -> Result<FileInspection> {
    let df = read_parquet(path)?;

    let columns = df
        .get_columns()
        .iter()
        .map(|column| ColumnInfo {
            name: column.name().to_string(),
            dtype: column.dtype().to_string(),
        })
        .collect();

    let mut distinct_values = Vec::new();
    for name in KEY_COLUMNS {
        if has_column(&df, name) {
            distinct_values.push((
                name.to_string(),
                first_distinct(text_values(&df, name)?, INSPECT_DISTINCT_VALUES),
            ));
        }
    }

    let key_examples = if has_column(&df, columns::SAMPLING_POINT) {
        text_values(&df, columns::SAMPLING_POINT)?
            .into_iter()
            .flatten()
            .take(INSPECT_KEY_EXAMPLES)
            .map(|raw| {
                let key = normalizer.normalize(&raw).into_owned();
                (raw, key)
            })
            .collect()
    } else {
        Vec::new()
    };

    Ok(FileInspection {
        path: path.to_path_buf(),
        rows: df.height(),
        columns,
        distinct_values,
        key_examples,
    })
}

fn first_distinct(values: Vec<Option<String>>, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .flatten()
        .filter(|value| seen.insert(value.clone()))
        .take(limit)
        .collect()
}
