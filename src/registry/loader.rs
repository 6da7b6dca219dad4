//! Registry loading from the station metadata CSV
//!
//! The metadata table is read with every column as text so identifiers keep
//! their leading zeros; coordinates are parsed afterwards and rows whose
//! coordinates do not parse are kept without a location.

use super::StationRegistry;
use crate::constants::registry_columns;
use crate::error::{ExtractError, Result};
use crate::frame::{float_values, missing_columns, read_csv_as_text, text_values};
use crate::models::StationRecord;
use crate::normalizer::IdentifierNormalizer;
use polars::prelude::DataFrame;
use std::path::Path;
use tracing::{debug, info, warn};

impl StationRegistry {
    /// Load and index the station metadata table.
    ///
    /// # Errors
    /// * `MissingFile` when `path` does not exist
    /// * `UnreadableFile` when the CSV cannot be parsed
    /// * `SchemaError` when a required column is absent
    pub fn load(path: &Path, normalizer: &IdentifierNormalizer) -> Result<Self> {
        let df = read_registry_frame(path, registry_columns::REQUIRED)?;
        let rows_read = df.height();

        let identifiers = text_values(&df, registry_columns::SAMPLING_POINT_ID)?;
        let longitudes = float_values(&df, registry_columns::LONGITUDE)?;
        let latitudes = float_values(&df, registry_columns::LATITUDE)?;
        let eoi_codes = text_values(&df, registry_columns::EOI_CODE)?;
        let pollutants = text_values(&df, registry_columns::AIR_POLLUTANT)?;

        let mut rows = Vec::with_capacity(rows_read);
        let mut rows_without_identifier = 0;

        for (row, raw) in identifiers.into_iter().enumerate() {
            let Some(raw) = raw.filter(|value| !value.trim().is_empty()) else {
                rows_without_identifier += 1;
                continue;
            };
            rows.push(StationRecord {
                normalized_key: normalizer.normalize(&raw).into_owned(),
                raw_identifier: raw,
                longitude: longitudes[row],
                latitude: latitudes[row],
                eoi_code: eoi_codes[row].clone().unwrap_or_default(),
                pollutant_declared: pollutants[row].clone(),
            });
        }

        let mut registry = Self::from_records(path.to_path_buf(), rows);
        registry.rows_read = rows_read;
        registry.rows_without_identifier = rows_without_identifier;

        if rows_without_identifier > 0 {
            warn!(
                "{} registry rows have no '{}' and were ignored",
                rows_without_identifier,
                registry_columns::SAMPLING_POINT_ID
            );
        }
        let unlocatable = registry.unlocatable_count();
        if unlocatable > 0 {
            warn!(
                "{} registry stations have missing or non-numeric coordinates",
                unlocatable
            );
        }
        debug!(
            "Registry rows: {} read, {} duplicates dropped",
            rows_read, registry.duplicates_dropped
        );
        info!(
            "Loaded {} stations from {}",
            registry.len(),
            path.display()
        );

        Ok(registry)
    }
}

/// Read the metadata table and check that `required` columns are present
pub fn read_registry_frame(path: &Path, required: &[&str]) -> Result<DataFrame> {
    if !path.exists() {
        return Err(ExtractError::MissingFile {
            path: path.to_path_buf(),
        });
    }

    let df = read_csv_as_text(path)?;
    let missing = missing_columns(&df, required);
    if !missing.is_empty() {
        return Err(ExtractError::SchemaError {
            path: path.to_path_buf(),
            missing,
        });
    }

    Ok(df)
}
