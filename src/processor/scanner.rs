//! Per-file measurement scanning
//!
//! Reads one parquet file, derives the normalized station key of every row
//! and keeps the rows that pass the station, pollutant and time filters, in
//! that order. A file that cannot be used becomes a skip diagnostic instead
//! of an error so the rest of the run carries on.

use crate::constants::columns;
use crate::error::Result;
use crate::filters::{PollutantFilter, canonical_pollutant};
use crate::frame::{filter_rows, has_column, put_text_column, read_parquet, text_values, timestamp_values};
use crate::models::{FileOutcome, FilterCounts, MatchedFile, SkipReason, SkippedFile, TimeRange};
use crate::normalizer::IdentifierNormalizer;
use crate::registry::TargetKeySet;
use polars::prelude::DataFrame;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Scans measurement files against one run's target keys and filters.
///
/// Holds only read-only state, so a single scanner is shared by every worker.
#[derive(Debug, Clone)]
pub struct SourceScanner {
    normalizer: Arc<IdentifierNormalizer>,
    targets: Arc<TargetKeySet>,
    pollutants: Option<PollutantFilter>,
    time_range: TimeRange,
}

impl SourceScanner {
    pub fn new(normalizer: Arc<IdentifierNormalizer>, targets: Arc<TargetKeySet>) -> Self {
        Self {
            normalizer,
            targets,
            pollutants: None,
            time_range: TimeRange::unbounded(),
        }
    }

    /// Keep only rows whose pollutant is in `filter`
    pub fn with_pollutants(mut self, filter: Option<PollutantFilter>) -> Self {
        self.pollutants = filter;
        self
    }

    /// Keep only rows whose interval overlaps `range`
    pub fn with_time_range(mut self, range: TimeRange) -> Self {
        self.time_range = range;
        self
    }

    pub fn targets(&self) -> &TargetKeySet {
        &self.targets
    }

    /// Scan one file. Never fails: problems become `FileOutcome::Skipped`.
    pub fn scan_file(&self, path: &Path) -> FileOutcome {
        let df = match read_parquet(path) {
            Ok(df) => df,
            Err(e) => return skipped(path, SkipReason::Unreadable(e.to_string())),
        };

        if !has_column(&df, columns::SAMPLING_POINT) {
            return skipped(path, SkipReason::MissingIdentifierColumn);
        }

        match self.filter_frame(path, &df) {
            Ok(matched) => {
                let counts = &matched.counts;
                trace!(
                    "{}: {} rows read, {} after station, {} after pollutant, {} after time",
                    path.display(),
                    counts.rows_read,
                    counts.after_station,
                    counts.after_pollutant,
                    counts.after_time
                );
                FileOutcome::Scanned(matched)
            }
            Err(e) => skipped(path, SkipReason::Unreadable(e.to_string())),
        }
    }

    /// Apply the filters to a decoded measurement table and append the
    /// `StationKey` column. First-seen row order is preserved.
    ///
    /// Any column that cannot be read fails the whole file, so a file either
    /// contributes its rows together with their keys and codes, or nothing.
    pub fn filter_frame(&self, path: &Path, df: &DataFrame) -> Result<MatchedFile> {
        let identifiers = text_values(df, columns::SAMPLING_POINT)?;
        let keys = self
            .normalizer
            .normalize_all(identifiers.iter().map(|value| value.as_deref()));

        let mut counts = FilterCounts {
            rows_read: df.height(),
            ..FilterCounts::default()
        };

        let mut keep: Vec<bool> = keys
            .iter()
            .map(|key| key.as_deref().is_some_and(|key| self.targets.contains(key)))
            .collect();
        counts.after_station = count_kept(&keep);

        if let Some(filter) = &self.pollutants {
            if has_column(df, columns::POLLUTANT) {
                let cells = text_values(df, columns::POLLUTANT)?;
                for (kept, cell) in keep.iter_mut().zip(&cells) {
                    *kept = *kept && filter.accepts(cell.as_deref());
                }
            } else {
                debug!("No {} column, pollutant filter rejects every row", columns::POLLUTANT);
                keep.iter_mut().for_each(|kept| *kept = false);
            }
        }
        counts.after_pollutant = count_kept(&keep);

        if !self.time_range.is_unbounded() && counts.after_pollutant > 0 {
            self.apply_time_range(df, &mut keep)?;
        }
        counts.after_time = count_kept(&keep);

        let station_keys: Vec<Option<String>> = keys
            .into_iter()
            .zip(&keep)
            .filter(|(_, kept)| **kept)
            .map(|(key, _)| key)
            .collect();

        let mut frame = filter_rows(df, &keep)?;
        let pollutant_codes = pollutant_codes(&frame)?;
        let distinct_keys: BTreeSet<String> = station_keys.iter().flatten().cloned().collect();
        put_text_column(&mut frame, columns::STATION_KEY, station_keys)?;

        Ok(MatchedFile {
            path: path.to_path_buf(),
            frame,
            counts,
            station_keys: distinct_keys,
            pollutant_codes,
        })
    }

    /// Interval-overlap filter. A bound whose interval column is absent is
    /// not applied.
    fn apply_time_range(&self, df: &DataFrame, keep: &mut [bool]) -> Result<()> {
        let ends = match self.time_range.start() {
            Some(_) if has_column(df, columns::END) => Some(timestamp_values(df, columns::END)?),
            _ => None,
        };
        let starts = match self.time_range.end() {
            Some(_) if has_column(df, columns::START) => {
                Some(timestamp_values(df, columns::START)?)
            }
            _ => None,
        };
        if ends.is_none() && starts.is_none() {
            return Ok(());
        }

        let effective = TimeRange::new(
            ends.as_ref().and(self.time_range.start()),
            starts.as_ref().and(self.time_range.end()),
        )?;

        for (row, kept) in keep.iter_mut().enumerate() {
            if !*kept {
                continue;
            }
            let interval_start = starts.as_ref().and_then(|values| values[row]);
            let interval_end = ends.as_ref().and_then(|values| values[row]);
            *kept = effective.overlaps(interval_start, interval_end);
        }
        Ok(())
    }

    /// Distinct normalized keys of a file, ignoring every filter.
    ///
    /// Used by the identifier reconciler.
    pub fn distinct_keys(&self, path: &Path) -> std::result::Result<BTreeSet<String>, SkipReason> {
        let df = read_parquet(path).map_err(|e| SkipReason::Unreadable(e.to_string()))?;
        if !has_column(&df, columns::SAMPLING_POINT) {
            return Err(SkipReason::MissingIdentifierColumn);
        }
        let identifiers = text_values(&df, columns::SAMPLING_POINT)
            .map_err(|e| SkipReason::Unreadable(e.to_string()))?;

        Ok(self
            .normalizer
            .normalize_all(identifiers.iter().map(|value| value.as_deref()))
            .into_iter()
            .flatten()
            .collect())
    }
}

/// Distinct canonical pollutant codes of a table; empty without a
/// `Pollutant` column
fn pollutant_codes(df: &DataFrame) -> Result<BTreeSet<String>> {
    if !has_column(df, columns::POLLUTANT) {
        return Ok(BTreeSet::new());
    }
    Ok(text_values(df, columns::POLLUTANT)?
        .iter()
        .flatten()
        .map(|code| canonical_pollutant(code))
        .collect())
}

fn count_kept(keep: &[bool]) -> usize {
    keep.iter().filter(|kept| **kept).count()
}

fn skipped(path: &Path, reason: SkipReason) -> FileOutcome {
    warn!("Skipping {}: {}", path.display(), reason);
    FileOutcome::Skipped(SkippedFile {
        path: path.to_path_buf(),
        reason,
    })
}
