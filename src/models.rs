//! Core data structures for EEA extraction.
//!
//! Defines station records, the bounding box and time-range filters,
//! per-file scan outcomes and run statistics used throughout the library.

use crate::error::{ExtractError, Result};
use chrono::NaiveDateTime;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// One station registry row after normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    pub raw_identifier: String,
    pub normalized_key: String,
    /// `None` when the registry value is missing or not numeric
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub eoi_code: String,
    pub pollutant_declared: Option<String>,
}

impl StationRecord {
    /// Coordinates as (longitude, latitude), if both are usable
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.longitude, self.latitude) {
            (Some(lon), Some(lat)) if lon.is_finite() && lat.is_finite() => Some((lon, lat)),
            _ => None,
        }
    }
}

/// Axis-aligned longitude/latitude rectangle. Always valid once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    min_lon: f64,
    max_lon: f64,
    min_lat: f64,
    max_lat: f64,
}

impl BoundingBox {
    /// Validate and build a bounding box; `min < max` on both axes
    pub fn new(min_lon: f64, max_lon: f64, min_lat: f64, max_lat: f64) -> Result<Self> {
        if [min_lon, max_lon, min_lat, max_lat]
            .iter()
            .any(|value| !value.is_finite())
        {
            return Err(ExtractError::invalid_bbox(format!(
                "coordinates must be finite, got [{min_lon}, {max_lon}, {min_lat}, {max_lat}]"
            )));
        }
        if min_lon >= max_lon {
            return Err(ExtractError::invalid_bbox(format!(
                "min_lon ({min_lon}) >= max_lon ({max_lon})"
            )));
        }
        if min_lat >= max_lat {
            return Err(ExtractError::invalid_bbox(format!(
                "min_lat ({min_lat}) >= max_lat ({max_lat})"
            )));
        }
        Ok(Self {
            min_lon,
            max_lon,
            min_lat,
            max_lat,
        })
    }

    /// Build from the CLI order `[min_lon, max_lon, min_lat, max_lat]`
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        match values {
            [min_lon, max_lon, min_lat, max_lat] => {
                Self::new(*min_lon, *max_lon, *min_lat, *max_lat)
            }
            _ => Err(ExtractError::invalid_bbox(format!(
                "expected 4 values (min_lon max_lon min_lat max_lat), got {}",
                values.len()
            ))),
        }
    }

    /// Inclusive on all four edges
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }

    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.4}, {:.4}, {:.4}, {:.4}]",
            self.min_lon, self.max_lon, self.min_lat, self.max_lat
        )
    }
}

/// Optional time window; a missing bound is unbounded on that side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
}

impl TimeRange {
    pub fn new(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Result<Self> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(ExtractError::InvalidTimeRange {
                    reason: format!("start ({start}) is after end ({end})"),
                });
            }
        }
        Ok(Self { start, end })
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        self.end
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Interval-overlap test: keep when `interval_end >= start` and
    /// `interval_start <= end`. A missing interval value cannot satisfy a
    /// bound that is set.
    pub fn overlaps(
        &self,
        interval_start: Option<NaiveDateTime>,
        interval_end: Option<NaiveDateTime>,
    ) -> bool {
        let after_start = match self.start {
            None => true,
            Some(start) => interval_end.is_some_and(|end| end >= start),
        };
        let before_end = match self.end {
            None => true,
            Some(end) => interval_start.is_some_and(|start| start <= end),
        };
        after_start && before_end
    }
}

/// A pollutant filter value: a numeric code, or a name passed through
/// unresolved
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PollutantCode {
    Code(i64),
    Unresolved(String),
}

impl PollutantCode {
    /// Canonical text used to compare against measurement cells
    pub fn match_key(&self) -> String {
        match self {
            PollutantCode::Code(code) => code.to_string(),
            PollutantCode::Unresolved(name) => name.clone(),
        }
    }
}

impl fmt::Display for PollutantCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollutantCode::Code(code) => write!(f, "{code}"),
            PollutantCode::Unresolved(name) => write!(f, "{name}"),
        }
    }
}

/// One row of a measurement table, as seen by consumers of a scan
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRow {
    pub raw_identifier: String,
    pub normalized_key: String,
    pub pollutant_code: Option<String>,
    pub interval_start: Option<NaiveDateTime>,
    pub interval_end: Option<NaiveDateTime>,
    pub value: Option<f64>,
    pub validity: Option<String>,
    pub verification: Option<String>,
}

/// Why a measurement file contributed nothing to a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The `Samplingpoint` column is absent
    MissingIdentifierColumn,
    /// The file could not be opened or decoded
    Unreadable(String),
    /// The scan worker failed before producing a result
    WorkerFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingIdentifierColumn => write!(f, "no Samplingpoint column"),
            SkipReason::Unreadable(reason) => write!(f, "unreadable: {reason}"),
            SkipReason::WorkerFailed(reason) => write!(f, "worker failed: {reason}"),
        }
    }
}

/// A skipped file and the reason it was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Row counts after each filter stage of a single file scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCounts {
    pub rows_read: usize,
    pub after_station: usize,
    pub after_pollutant: usize,
    pub after_time: usize,
}

/// Rows of one file that survived every filter, with the `StationKey` column
/// appended. May hold zero rows.
#[derive(Debug, Clone)]
pub struct MatchedFile {
    pub path: PathBuf,
    pub frame: DataFrame,
    pub counts: FilterCounts,
    /// Distinct station keys of the kept rows
    pub station_keys: BTreeSet<String>,
    /// Distinct canonical pollutant codes of the kept rows
    pub pollutant_codes: BTreeSet<String>,
}

/// Result of scanning one measurement file
#[derive(Debug, Clone)]
pub enum FileOutcome {
    Scanned(MatchedFile),
    Skipped(SkippedFile),
}

impl FileOutcome {
    pub fn path(&self) -> &std::path::Path {
        match self {
            FileOutcome::Scanned(matched) => &matched.path,
            FileOutcome::Skipped(skipped) => &skipped.path,
        }
    }
}

/// Processing statistics for one extraction run
#[derive(Debug, Default, Clone, Serialize)]
pub struct ProcessingStats {
    pub target_stations: usize,
    pub files_scanned: usize,
    pub files_with_matches: usize,
    pub files_skipped: usize,
    pub total_rows: usize,
    pub output_path: Option<PathBuf>,
    pub processing_time_ms: u128,
}
