//! Row-level view of matched measurement tables

use crate::constants::columns;
use crate::error::Result;
use crate::filters::canonical_pollutant;
use crate::frame::{float_values, has_column, text_values, timestamp_values};
use crate::models::{MatchedFile, MeasurementRow};
use chrono::NaiveDateTime;
use polars::prelude::DataFrame;

/// Single-pass iterator over the rows of a matched table.
///
/// Optional columns that a file does not carry yield `None` fields.
#[derive(Debug)]
pub struct MeasurementRows {
    identifiers: Vec<Option<String>>,
    keys: Vec<Option<String>>,
    pollutants: Option<Vec<Option<String>>>,
    starts: Option<Vec<Option<NaiveDateTime>>>,
    ends: Option<Vec<Option<NaiveDateTime>>>,
    values: Option<Vec<Option<f64>>>,
    validity: Option<Vec<Option<String>>>,
    verification: Option<Vec<Option<String>>>,
    position: usize,
}

impl MeasurementRows {
    /// Build from a table carrying `Samplingpoint` and `StationKey`
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        Ok(Self {
            identifiers: text_values(df, columns::SAMPLING_POINT)?,
            keys: text_values(df, columns::STATION_KEY)?,
            pollutants: optional(df, columns::POLLUTANT, text_values)?,
            starts: optional(df, columns::START, timestamp_values)?,
            ends: optional(df, columns::END, timestamp_values)?,
            values: optional(df, columns::VALUE, float_values)?,
            validity: optional(df, columns::VALIDITY, text_values)?,
            verification: optional(df, columns::VERIFICATION, text_values)?,
            position: 0,
        })
    }
}

fn optional<T>(
    df: &DataFrame,
    name: &str,
    read: fn(&DataFrame, &str) -> Result<Vec<T>>,
) -> Result<Option<Vec<T>>> {
    if has_column(df, name) {
        read(df, name).map(Some)
    } else {
        Ok(None)
    }
}

fn cell<T: Clone>(values: &Option<Vec<Option<T>>>, row: usize) -> Option<T> {
    values.as_ref().and_then(|values| values[row].clone())
}

impl Iterator for MeasurementRows {
    type Item = MeasurementRow;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.position;
        if row >= self.identifiers.len() {
            return None;
        }
        self.position += 1;

        Some(MeasurementRow {
            raw_identifier: self.identifiers[row].clone().unwrap_or_default(),
            normalized_key: self.keys[row].clone().unwrap_or_default(),
            pollutant_code: cell(&self.pollutants, row).map(|code| canonical_pollutant(&code)),
            interval_start: cell(&self.starts, row),
            interval_end: cell(&self.ends, row),
            value: cell(&self.values, row),
            validity: cell(&self.validity, row),
            verification: cell(&self.verification, row),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.identifiers.len() - self.position;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for MeasurementRows {}

impl MatchedFile {
    /// Iterate the matched rows of this file
    pub fn rows(&self) -> Result<MeasurementRows> {
        MeasurementRows::from_frame(&self.frame)
    }
}
