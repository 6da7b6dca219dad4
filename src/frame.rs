//! Polars helpers shared by the registry, scanner and enrich stages.
//!
//! Tables are read eagerly into `DataFrame`s; cells are pulled out as plain
//! Rust values through the typed accessors below so the matching logic never
//! depends on the physical dtype a given download happened to use.

use crate::error::{ExtractError, Result};
use crate::filters::parse_timestamp_lenient;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Read a whole parquet file
pub fn read_parquet(path: &Path) -> Result<DataFrame> {
    let file = File::open(path).map_err(|e| ExtractError::unreadable(path, e))?;
    ParquetReader::new(file)
        .finish()
        .map_err(|e| ExtractError::unreadable(path, e))
}

/// Read a CSV file with every column typed as text
pub fn read_csv_as_text(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(ExtractError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()
        .and_then(|lf| lf.collect())
        .map_err(|e| ExtractError::unreadable(path, e))
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

/// Names of `required` that `df` lacks, in the order given
pub fn missing_columns(df: &DataFrame, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|name| !has_column(df, name))
        .map(|name| name.to_string())
        .collect()
}

/// Cells of a column rendered as text; integral floats lose their `.0`
pub fn text_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)?;
    let series = column.as_materialized_series();
    let values = match series.dtype() {
        DataType::String => series
            .str()?
            .into_iter()
            .map(|cell| cell.map(str::to_string))
            .collect(),
        DataType::Float32 | DataType::Float64 => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|cell| cell.map(format_number))
            .collect(),
        _ => {
            let text = series.cast(&DataType::String)?;
            text.str()?
                .into_iter()
                .map(|cell| cell.map(str::to_string))
                .collect()
        }
    };
    Ok(values)
}

/// Cells of a column as floats; text that does not parse becomes `None`
pub fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df.column(name)?.as_materialized_series();
    let values = match series.dtype() {
        DataType::String => series
            .str()?
            .into_iter()
            .map(|cell| cell.and_then(|text| text.trim().parse::<f64>().ok()))
            .collect(),
        _ => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .collect(),
    };
    Ok(values)
}

/// Cells of a time column as naive timestamps.
///
/// Datetime and date columns are converted exactly; text columns are parsed
/// with the accepted timestamp formats and unparseable cells become `None`.
pub fn timestamp_values(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDateTime>>> {
    let series = df.column(name)?.as_materialized_series();
    let values = match series.dtype() {
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            series
                .cast(&DataType::Int64)?
                .i64()?
                .into_iter()
                .map(|cell| cell.and_then(|raw| epoch_to_naive(raw, unit)))
                .collect()
        }
        DataType::Date => series
            .cast(&DataType::Int32)?
            .i32()?
            .into_iter()
            .map(|cell| cell.and_then(days_to_naive))
            .collect(),
        DataType::String => series
            .str()?
            .into_iter()
            .map(|cell| cell.and_then(parse_timestamp_lenient))
            .collect(),
        _ => series
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|cell| cell.and_then(parse_timestamp_lenient))
            .collect(),
    };
    Ok(values)
}

/// Keep the rows whose mask entry is true
pub fn filter_rows(df: &DataFrame, mask: &[bool]) -> Result<DataFrame> {
    let mask = BooleanChunked::from_slice("mask".into(), mask);
    Ok(df.filter(&mask)?)
}

/// Append or replace a text column
pub fn put_text_column(df: &mut DataFrame, name: &str, values: Vec<Option<String>>) -> Result<()> {
    df.with_column(Column::new(name.into(), values))?;
    Ok(())
}

fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn epoch_to_naive(raw: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let utc = match unit {
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(raw)),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(raw),
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(raw),
    };
    utc.map(|value| value.naive_utc())
}

fn days_to_naive(days: i32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1970, 1, 1)?
        .checked_add_signed(chrono::Duration::days(days as i64))?
        .and_hms_opt(0, 0, 0)
}
