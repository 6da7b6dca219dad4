//! Accumulation of per-file scan results into one run result
//!
//! The aggregator is the single writer of a run: outcomes are merged one at a
//! time, in scan order, and each merge either commits everything a file
//! contributed or nothing.

use crate::constants::{columns, registry_columns};
use crate::error::Result;
use crate::frame::{has_column, text_values};
use crate::models::{FileOutcome, SkippedFile};
use crate::processor::writer::order_columns;
use crate::registry::{StationRegistry, TargetKeySet};
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Match statistics of a run, as printed in check mode
#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub target_stations: usize,
    pub matched_stations: BTreeSet<String>,
    /// Target keys without a single matching row, in selection order
    pub unmatched_stations: Vec<String>,
    pub total_rows: usize,
    pub pollutants: BTreeSet<String>,
    pub files_scanned: usize,
    pub files_with_matches: usize,
    pub skipped: Vec<SkippedFile>,
}

impl MatchReport {
    pub fn summary_line(&self) -> String {
        format!(
            "{} of {} target stations matched",
            self.matched_stations.len(),
            self.target_stations
        )
    }
}

/// Combines scan outcomes into a table, or only into statistics when built
/// with [`MatchAggregator::count_only`]
#[derive(Debug)]
pub struct MatchAggregator {
    targets: Arc<TargetKeySet>,
    frames: Vec<DataFrame>,
    skipped: Vec<SkippedFile>,
    matched_keys: BTreeSet<String>,
    pollutants: BTreeSet<String>,
    files_scanned: usize,
    files_with_matches: usize,
    total_rows: usize,
    keep_frames: bool,
}

impl MatchAggregator {
    pub fn new(targets: Arc<TargetKeySet>) -> Self {
        Self {
            targets,
            frames: Vec::new(),
            skipped: Vec::new(),
            matched_keys: BTreeSet::new(),
            pollutants: BTreeSet::new(),
            files_scanned: 0,
            files_with_matches: 0,
            total_rows: 0,
            keep_frames: true,
        }
    }

    /// Aggregator that keeps statistics but discards the rows
    pub fn count_only(targets: Arc<TargetKeySet>) -> Self {
        Self {
            keep_frames: false,
            ..Self::new(targets)
        }
    }

    /// Merge one file's outcome. The scanner has already read everything
    /// needed, so merging cannot fail.
    pub fn merge(&mut self, outcome: FileOutcome) {
        let matched = match outcome {
            FileOutcome::Skipped(skipped) => {
                self.skipped.push(skipped);
                return;
            }
            FileOutcome::Scanned(matched) => matched,
        };

        let height = matched.frame.height();
        self.files_scanned += 1;
        if height > 0 {
            self.files_with_matches += 1;
            self.total_rows += height;
            self.matched_keys.extend(matched.station_keys);
            self.pollutants.extend(matched.pollutant_codes);
            if self.keep_frames {
                self.frames.push(matched.frame);
            }
        }
        debug!(
            "Merged {}: {} rows (running total {})",
            matched.path.display(),
            height,
            self.total_rows
        );
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    pub fn report(&self) -> MatchReport {
        MatchReport {
            target_stations: self.targets.len(),
            matched_stations: self.matched_keys.clone(),
            unmatched_stations: self
                .targets
                .iter()
                .filter(|key| !self.matched_keys.contains(*key))
                .map(String::from)
                .collect(),
            total_rows: self.total_rows,
            pollutants: self.pollutants.clone(),
            files_scanned: self.files_scanned,
            files_with_matches: self.files_with_matches,
            skipped: self.skipped.clone(),
        }
    }

    /// Build the output table: union of every contributing file's columns,
    /// station columns from the registry, grouped column order.
    ///
    /// Returns `None` when no row matched.
    pub fn finish_table(self, registry: &StationRegistry) -> Result<Option<DataFrame>> {
        if self.frames.is_empty() {
            return Ok(None);
        }

        let mut table = if self.frames.len() == 1 {
            self.frames.into_iter().next().unwrap_or_default()
        } else {
            let frames: Vec<LazyFrame> = self.frames.into_iter().map(DataFrame::lazy).collect();
            concat_lf_diagonal(
                frames,
                UnionArgs {
                    to_supertypes: true,
                    ..Default::default()
                },
            )?
            .collect()?
        };

        add_station_columns(&mut table, registry)?;

        let names: Vec<String> = table
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();
        let table = table.select(order_columns(&names))?;

        Ok(Some(table))
    }
}

/// Add EoI code and coordinates by station key, unless the measurement
/// files already carry columns of those names
fn add_station_columns(table: &mut DataFrame, registry: &StationRegistry) -> Result<()> {
    let keys = text_values(table, columns::STATION_KEY)?;
    let stations: Vec<_> = keys
        .iter()
        .map(|key| key.as_deref().and_then(|key| registry.get(key)))
        .collect();

    if !has_column(table, registry_columns::EOI_CODE) {
        let codes: Vec<Option<String>> = stations
            .iter()
            .map(|station| station.map(|record| record.eoi_code.clone()))
            .collect();
        table.with_column(Column::new(registry_columns::EOI_CODE.into(), codes))?;
    }
    if !has_column(table, registry_columns::LONGITUDE) {
        let longitudes: Vec<Option<f64>> = stations
            .iter()
            .map(|station| station.and_then(|record| record.longitude))
            .collect();
        table.with_column(Column::new(registry_columns::LONGITUDE.into(), longitudes))?;
    }
    if !has_column(table, registry_columns::LATITUDE) {
        let latitudes: Vec<Option<f64>> = stations
            .iter()
            .map(|station| station.and_then(|record| record.latitude))
            .collect();
        table.with_column(Column::new(registry_columns::LATITUDE.into(), latitudes))?;
    }
    Ok(())
}
