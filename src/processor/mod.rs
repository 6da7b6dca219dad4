//! Extraction engine.
//!
//! Orchestrates one run: validate the request, load the registry, select the
//! target stations, discover measurement files, scan them concurrently and
//! hand the ordered outcomes to a single aggregator.

pub mod aggregator;
pub mod discovery;
pub mod rows;
pub mod scanner;
pub mod writer;

#[cfg(test)]
pub mod tests;

use self::{
    aggregator::{MatchAggregator, MatchReport},
    discovery::{FileDiscovery, SourceDirectory},
    scanner::SourceScanner,
    writer::CsvOutputWriter,
};

use crate::config::{ExtractConfig, SystemProfile};
use crate::enrich::vocabulary::{VocabularyKind, Vocabularies};
use crate::error::{ExtractError, Result};
use crate::filters::{PollutantFilter, PollutantTable, parse_time_range};
use crate::models::{
    BoundingBox, FileOutcome, ProcessingStats, SkipReason, SkippedFile, TimeRange,
};
use crate::normalizer::IdentifierNormalizer;
use crate::reconciler::{DirectoryKeys, ReconcileReport, reconcile};
use crate::registry::{StationRegistry, TargetKeySet};

use futures::future;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Everything an extraction run is asked to do, as given by the user
#[derive(Debug, Clone)]
pub struct ExtractRequest {
    pub input_dirs: Vec<PathBuf>,
    pub metadata_path: PathBuf,
    pub output_path: PathBuf,
    /// `[min_lon, max_lon, min_lat, max_lat]`
    pub bbox: Vec<f64>,
    pub pollutants: Vec<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    /// Vocabulary directory used to extend the pollutant name table
    pub vocab_dir: Option<PathBuf>,
}

/// What a run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Write the matched rows to the output CSV
    Extract,
    /// Report match statistics without writing anything
    Check,
    /// Compare registry keys with the keys used in the files
    DebugIds,
}

#[derive(Debug)]
pub enum RunOutcome {
    /// The bounding box selected no station; nothing was scanned
    NoTargetStations,
    Extracted {
        stats: ProcessingStats,
        report: MatchReport,
    },
    Checked(MatchReport),
    Reconciled(ReconcileReport),
}

/// Main processor for bounding-box extraction
#[derive(Debug)]
pub struct ExtractionProcessor {
    request: ExtractRequest,
    config: ExtractConfig,
    bbox: BoundingBox,
    time_range: TimeRange,
    pollutants: Option<PollutantFilter>,
    normalizer: Arc<IdentifierNormalizer>,
}

impl ExtractionProcessor {
    /// Validate the request. Bounding box, time range and configuration are
    /// checked before any file is touched.
    pub fn new(request: ExtractRequest, config: ExtractConfig) -> Result<Self> {
        let bbox = BoundingBox::from_slice(&request.bbox)?;
        let time_range = parse_time_range(request.start.as_deref(), request.end.as_deref())?;
        config.validate()?;

        let pollutants = if request.pollutants.is_empty() {
            None
        } else {
            let table = pollutant_table(request.vocab_dir.as_deref());
            Some(PollutantFilter::resolve(&request.pollutants, &table))
        };

        Ok(Self {
            request,
            config,
            bbox,
            time_range,
            pollutants,
            normalizer: Arc::new(IdentifierNormalizer::new()?),
        })
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn pollutant_filter(&self) -> Option<&PollutantFilter> {
        self.pollutants.as_ref()
    }

    /// Run the request in `mode`. Cancelling `cancel` stops scheduling new
    /// files; the run then returns `Interrupted` without writing output.
    pub async fn run(&self, mode: RunMode, cancel: &CancellationToken) -> Result<RunOutcome> {
        let start_time = Instant::now();

        let registry = self.load_registry().await?;
        let targets = Arc::new(registry.target_keys(&self.bbox));
        if targets.is_empty() {
            info!("No stations inside {}", self.bbox);
            return Ok(RunOutcome::NoTargetStations);
        }
        info!("Target stations: {}", targets.len());

        let directories = FileDiscovery::new(self.request.input_dirs.clone())
            .discover()
            .await?;

        let scanner = Arc::new(
            SourceScanner::new(self.normalizer.clone(), targets.clone())
                .with_pollutants(self.pollutants.clone())
                .with_time_range(self.time_range),
        );

        match mode {
            RunMode::DebugIds => {
                let report = self.reconcile_ids(&directories, &scanner, &targets, cancel).await?;
                Ok(RunOutcome::Reconciled(report))
            }
            RunMode::Check => {
                let aggregator = self
                    .scan_into(MatchAggregator::count_only(targets), &directories, &scanner, cancel)
                    .await?;
                Ok(RunOutcome::Checked(aggregator.report()))
            }
            RunMode::Extract => {
                let aggregator = self
                    .scan_into(MatchAggregator::new(targets.clone()), &directories, &scanner, cancel)
                    .await?;
                let report = aggregator.report();
                let files_scanned = report.files_scanned;

                if cancel.is_cancelled() {
                    return Err(interrupted());
                }
                let output_path = self.write_output(aggregator, registry).await?;

                let stats = ProcessingStats {
                    target_stations: targets.len(),
                    files_scanned,
                    files_with_matches: report.files_with_matches,
                    files_skipped: report.skipped.len(),
                    total_rows: report.total_rows,
                    output_path,
                    processing_time_ms: start_time.elapsed().as_millis(),
                };
                Ok(RunOutcome::Extracted { stats, report })
            }
        }
    }

    /// Load the registry on the blocking pool; polars drives its own runtime
    /// while collecting the CSV
    async fn load_registry(&self) -> Result<StationRegistry> {
        let path = self.request.metadata_path.clone();
        let normalizer = self.normalizer.clone();
        task::spawn_blocking(move || StationRegistry::load(&path, &normalizer))
            .await
            .map_err(|e| ExtractError::ProcessingFailed {
                path: self.request.metadata_path.clone(),
                reason: format!("registry load task failed: {e}"),
            })?
    }

    /// Build the output table and write it atomically. Returns the output
    /// path, or `None` when no row matched.
    async fn write_output(
        &self,
        aggregator: MatchAggregator,
        registry: StationRegistry,
    ) -> Result<Option<PathBuf>> {
        let output_path = self.request.output_path.clone();
        let writer = CsvOutputWriter::new(output_path.clone());

        task::spawn_blocking(move || -> Result<Option<PathBuf>> {
            let Some(mut table) = aggregator.finish_table(&registry)? else {
                return Ok(None);
            };
            let rows = writer.write(&mut table)?;
            info!("Wrote {} rows to {}", rows, writer.output_path().display());
            Ok(Some(writer.output_path().to_path_buf()))
        })
        .await
        .map_err(|e| ExtractError::ProcessingFailed {
            path: output_path,
            reason: format!("output task failed: {e}"),
        })?
    }

    /// Scan every discovered file and merge the outcomes in scan order
    async fn scan_into(
        &self,
        mut aggregator: MatchAggregator,
        directories: &[SourceDirectory],
        scanner: &Arc<SourceScanner>,
        cancel: &CancellationToken,
    ) -> Result<MatchAggregator> {
        let files: Vec<PathBuf> = directories
            .iter()
            .flat_map(|directory| directory.files.iter().cloned())
            .collect();
        info!(
            "Scanning {} files from {} directories",
            files.len(),
            directories.len()
        );

        let scanner = scanner.clone();
        let results = self
            .run_jobs(files, cancel, "Scanning", move |path| {
                Ok(scanner.scan_file(path))
            })
            .await?;

        for (path, result) in results {
            let outcome = result.unwrap_or_else(|reason| {
                warn!("Skipping {}: {}", path.display(), reason);
                FileOutcome::Skipped(SkippedFile { path, reason })
            });
            aggregator.merge(outcome);
        }

        let skipped = aggregator.skipped().len();
        if skipped > 0 {
            warn!("{} files were skipped", skipped);
        }
        Ok(aggregator)
    }

    /// Collect keys from a sample of each directory and reconcile them with
    /// the target stations
    async fn reconcile_ids(
        &self,
        directories: &[SourceDirectory],
        scanner: &Arc<SourceScanner>,
        targets: &TargetKeySet,
        cancel: &CancellationToken,
    ) -> Result<ReconcileReport> {
        let mut sources = Vec::with_capacity(directories.len());

        for directory in directories {
            let sample = directory.sampled(self.config.reconcile_sample_files).to_vec();
            debug!(
                "Sampling {} of {} files in {}",
                sample.len(),
                directory.files.len(),
                directory.path.display()
            );

            let scanner = scanner.clone();
            let results = self
                .run_jobs(sample, cancel, "Sampling", move |path| scanner.distinct_keys(path))
                .await?;

            let mut keys = DirectoryKeys {
                directory: directory.path.clone(),
                ..DirectoryKeys::default()
            };
            for (path, result) in results {
                match result {
                    Ok(found) => {
                        keys.files_sampled += 1;
                        keys.keys.extend(found);
                    }
                    Err(reason) => {
                        warn!("Skipping {}: {}", path.display(), reason);
                        keys.files_skipped += 1;
                    }
                }
            }
            sources.push(keys);
        }

        let registry_keys: BTreeSet<String> = targets.sorted();
        Ok(reconcile(&registry_keys, &sources))
    }

    /// Run `work` over `files` on the blocking pool, at most `workers` at a
    /// time, and return the results in input order
    async fn run_jobs<T, F>(
        &self,
        files: Vec<PathBuf>,
        cancel: &CancellationToken,
        label: &'static str,
        work: F,
    ) -> Result<Vec<(PathBuf, std::result::Result<T, SkipReason>)>>
    where
        T: Send + 'static,
        F: Fn(&Path) -> std::result::Result<T, SkipReason> + Send + Sync + 'static,
    {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let workers = self
            .config
            .effective_workers(&SystemProfile::detect())
            .min(files.len());
        let progress = self.progress_bar(files.len() as u64, label);
        let work = Arc::new(work);

        let mut results: Vec<(usize, PathBuf, std::result::Result<T, SkipReason>)> =
            stream::iter(files.into_iter().enumerate())
                .take_while(|_| future::ready(!cancel.is_cancelled()))
                .map(|(ordinal, path)| {
                    let work = work.clone();
                    let progress = progress.clone();
                    async move {
                        let job_path = path.clone();
                        let result = task::spawn_blocking(move || work(&job_path))
                            .await
                            .unwrap_or_else(|e| Err(SkipReason::WorkerFailed(e.to_string())));
                        if let Some(name) = path.file_name() {
                            progress.set_message(name.to_string_lossy().to_string());
                        }
                        progress.inc(1);
                        (ordinal, path, result)
                    }
                })
                .buffer_unordered(workers)
                .collect()
                .await;

        progress.finish_and_clear();

        if cancel.is_cancelled() {
            return Err(interrupted());
        }

        results.sort_by_key(|(ordinal, _, _)| *ordinal);
        Ok(results
            .into_iter()
            .map(|(_, path, result)| (path, result))
            .collect())
    }

    fn progress_bar(&self, length: u64, label: &str) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let progress = ProgressBar::new(length);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {prefix} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        progress.set_style(style);
        progress.set_prefix(label.to_string());
        progress
    }
}

/// Seed pollutant table, extended from the vocabulary directory when given
fn pollutant_table(vocab_dir: Option<&Path>) -> PollutantTable {
    let mut table = PollutantTable::seed();
    if let Some(dir) = vocab_dir {
        let vocabularies = Vocabularies::load_from_dir(dir, &[VocabularyKind::Pollutant]);
        let added = table.extend(vocabularies.pollutant_codes());
        debug!("Extended pollutant table with {} vocabulary entries", added);
    }
    table
}

fn interrupted() -> ExtractError {
    ExtractError::Interrupted {
        reason: "cancelled before all files were scanned".to_string(),
    }
}
