//! CSV output writing
//!
//! Writes result tables with the grouped column order used by every command.
//! The file appears atomically: the table is written to a temporary file next
//! to the target and renamed into place.

use crate::constants::column_groups;
use crate::error::{ExtractError, Result};

use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Order column names by group (identifier, station, measurement, quality),
/// then every remaining column in its current order. Names absent from
/// `names` are skipped.
pub fn order_columns(names: &[String]) -> Vec<String> {
    let present: HashSet<&str> = names.iter().map(String::as_str).collect();
    let mut ordered: Vec<String> = Vec::with_capacity(names.len());
    let mut placed: HashSet<&str> = HashSet::with_capacity(names.len());

    for group in column_groups::ORDERED {
        for &name in group.iter() {
            if present.contains(name) && placed.insert(name) {
                ordered.push(name.to_string());
            }
        }
    }
    for name in names {
        if placed.insert(name.as_str()) {
            ordered.push(name.clone());
        }
    }
    ordered
}

/// Atomic CSV writer for result tables
#[derive(Debug)]
pub struct CsvOutputWriter {
    output_path: PathBuf,
}

impl CsvOutputWriter {
    pub fn new(output_path: PathBuf) -> Self {
        Self { output_path }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Write `df` with a header row and return the number of data rows
    pub fn write(&self, df: &mut DataFrame) -> Result<usize> {
        let parent = match self.output_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let mut temp = NamedTempFile::new_in(&parent)?;
        CsvWriter::new(temp.as_file_mut())
            .include_header(true)
            .finish(df)?;

        temp.persist(&self.output_path)
            .map_err(|e| ExtractError::Io(e.error))?;

        debug!(
            "Wrote {} rows x {} columns to {}",
            df.height(),
            df.width(),
            self.output_path.display()
        );
        Ok(df.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn test_order_columns_by_group() {
        let ordered = order_columns(&names(&[
            "Extra",
            "Verification",
            "Value",
            "Longitude",
            "StationKey",
            "Start",
            "Samplingpoint",
            "Air Quality Station EoI Code",
            "Another",
        ]));
        assert_eq!(
            ordered,
            names(&[
                "Samplingpoint",
                "StationKey",
                "Air Quality Station EoI Code",
                "Longitude",
                "Start",
                "Value",
                "Verification",
                "Extra",
                "Another",
            ])
        );
    }

    #[test]
    fn test_order_columns_keeps_every_name_once() {
        let input = names(&["b", "a", "Value", "c"]);
        let ordered = order_columns(&input);
        assert_eq!(ordered.len(), input.len());
        assert_eq!(ordered, names(&["Value", "b", "a", "c"]));
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out").join("nested").join("result.csv");
        let mut df = df!(
            "Samplingpoint" => ["IT/SPO.IT1823A_5"],
            "Value" => [12.5f64],
        )
        .unwrap();

        let rows = CsvOutputWriter::new(path.clone()).write(&mut df).unwrap();

        assert_eq!(rows, 1);
        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("Samplingpoint,Value"));
        assert_eq!(lines.next(), Some("IT/SPO.IT1823A_5,12.5"));
    }

    #[test]
    fn test_write_replaces_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("result.csv");
        fs::write(&path, "old content\n").unwrap();

        let mut df = df!("a" => [1i64, 2]).unwrap();
        CsvOutputWriter::new(path.clone()).write(&mut df).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "a\n1\n2\n");
    }
}
