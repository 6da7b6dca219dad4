//! Station registry tests

pub mod query_tests;

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const HEADER: &str =
    "Sampling Point Id,Longitude,Latitude,Air Quality Station EoI Code,Air Pollutant,Air Quality Station Name";

/// Write a registry CSV with the standard header and the given data lines
pub fn write_registry(temp_dir: &TempDir, lines: &[&str]) -> PathBuf {
    let path = temp_dir.path().join("stations_metadata.csv");
    let mut content = String::from(HEADER);
    for line in lines {
        content.push('\n');
        content.push_str(line);
    }
    content.push('\n');
    fs::write(&path, content).unwrap();
    path
}
