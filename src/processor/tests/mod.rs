//! Pipeline tests for the extraction processor
//!
//! Fixtures are written into temporary directories: a registry CSV and a few
//! parquet measurement files per source directory.


use crate::config::ExtractConfig;
use crate::processor::ExtractRequest;
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const REGISTRY_HEADER: &str =
    "Sampling Point Id,Longitude,Latitude,Air Quality Station EoI Code,Air Pollutant";

/// Udine and Pordenone inside the default box, Rome outside it
pub const REGISTRY_LINES: &[&str] = &[
    "IT/SPO.IT1823A_5_BETA_2016-10-13_00:00:00,13.2,46.0,IT1823A,PM10",
    "IT/SPO.IT0508A_8_chemi_2010-01-01_00:00:00,12.9,45.9,IT0508A,NO2",
    "IT/SPO.IT0953A_8_chemi_2010-01-01_00:00:00,12.5,41.9,IT0953A,NO2",
];

pub const BBOX: [f64; 4] = [12.3, 13.95, 45.58, 46.67];

pub fn write_registry(root: &Path, lines: &[&str]) -> PathBuf {
    let path = root.join("metadata").join("stations_metadata.csv");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut content = String::from(REGISTRY_HEADER);
    for line in lines {
        content.push('\n');
        content.push_str(line);
    }
    content.push('\n');
    fs::write(&path, content).unwrap();
    path
}

pub fn write_parquet(dir: &Path, name: &str, mut df: DataFrame) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    let file = File::create(&path).unwrap();
    ParquetWriter::new(file).finish(&mut df).unwrap();
    path
}

/// Three Udine rows: PM10 on two days, NO2 on one
pub fn udine_rows() -> DataFrame {
    df!(
        "Samplingpoint" => [
            "IT/SPO.IT1823A_5_BETA_2016-10-13_00:00:00",
            "IT/SPO.IT1823A_5_BETA_2016-10-13_00:00:00",
            "IT/SPO.IT1823A_8_chemi_2016-10-13_00:00:00",
        ],
        "Pollutant" => [5i64, 5, 8],
        "Start" => ["2020-01-05 00:00:00", "2020-01-06 00:00:00", "2020-02-03 00:00:00"],
        "End" => ["2020-01-06 00:00:00", "2020-01-07 00:00:00", "2020-02-04 00:00:00"],
        "Value" => [21.5f64, 18.0, 40.2],
        "Validity" => [1i64, 1, 1],
        "Verification" => [1i64, 1, 3],
    )
    .unwrap()
}

/// Rows for stations that are not targets
pub fn foreign_rows() -> DataFrame {
    df!(
        "Samplingpoint" => [
            "IT/SPO.IT0953A_8_chemi_2010-01-01_00:00:00",
            "FR/SPO.FR01011_8_chemi_2012-01-01_00:00:00",
        ],
        "Pollutant" => [8i64, 8],
        "Start" => ["2020-01-05 00:00:00", "2020-01-05 00:00:00"],
        "End" => ["2020-01-06 00:00:00", "2020-01-06 00:00:00"],
        "Value" => [33.0f64, 12.0],
        "Validity" => [1i64, 1],
        "Verification" => [1i64, 1],
    )
    .unwrap()
}

/// Registry plus one hourly directory holding a matching and a foreign file
pub struct Fixture {
    pub temp_dir: TempDir,
    pub metadata: PathBuf,
    pub hourly: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let metadata = write_registry(temp_dir.path(), REGISTRY_LINES);
        let hourly = temp_dir.path().join("eea_hourly");
        write_parquet(&hourly, "a_udine.parquet", udine_rows());
        write_parquet(&hourly, "b_other.parquet", foreign_rows());
        Self {
            temp_dir,
            metadata,
            hourly,
        }
    }

    pub fn output(&self) -> PathBuf {
        self.temp_dir.path().join("out").join("eea_bbox.csv")
    }

    pub fn request(&self) -> ExtractRequest {
        ExtractRequest {
            input_dirs: vec![self.hourly.clone()],
            metadata_path: self.metadata.clone(),
            output_path: self.output(),
            bbox: BBOX.to_vec(),
            pollutants: Vec::new(),
            start: None,
            end: None,
            vocab_dir: None,
        }
    }
}

pub fn test_config() -> ExtractConfig {
    ExtractConfig::default().with_workers(2).without_progress()
}

/// Header and data lines of a CSV file
pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
