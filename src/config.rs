//! Configuration management.
//!
//! Provides the run configuration for extraction and the system profile used
//! to size the worker pool.

use crate::constants::{
    DEFAULT_MEMORY_THRESHOLD, DEFAULT_RECONCILE_SAMPLE_FILES, MAX_DEFAULT_WORKERS,
};
use crate::error::{ExtractError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// System profiling information for sizing concurrency
#[derive(Debug, Clone)]
pub struct SystemProfile {
    /// Number of CPU cores available
    pub cpu_cores: usize,
    /// Total memory in MB
    pub memory_mb: usize,
    /// Memory currently in use in MB
    pub used_memory_mb: usize,
}

impl SystemProfile {
    /// Auto-detect system capabilities
    pub fn detect() -> Self {
        use sysinfo::System;

        let cpu_cores = num_cpus::get();

        let mut system = System::new();
        system.refresh_memory();
        let memory_mb = (system.total_memory() / 1024 / 1024) as usize;
        let used_memory_mb = (system.used_memory() / 1024 / 1024) as usize;

        Self {
            cpu_cores,
            memory_mb,
            used_memory_mb,
        }
    }

    /// Fraction of memory in use, 0.0 when total memory is unknown
    pub fn memory_usage(&self) -> f64 {
        if self.memory_mb == 0 {
            return 0.0;
        }
        self.used_memory_mb as f64 / self.memory_mb as f64
    }
}

/// Configuration for one extraction run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Number of files scanned concurrently
    pub workers: usize,

    /// Memory usage fraction above which the worker count is halved
    pub memory_threshold: f64,

    /// Files sampled per directory by the identifier reconciler (`None` = all)
    pub reconcile_sample_files: Option<usize>,

    /// Show a progress bar while scanning
    pub show_progress: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().clamp(1, MAX_DEFAULT_WORKERS),
            memory_threshold: DEFAULT_MEMORY_THRESHOLD,
            reconcile_sample_files: Some(DEFAULT_RECONCILE_SAMPLE_FILES),
            show_progress: true,
        }
    }
}

impl ExtractConfig {
    /// Create configuration with custom worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the memory pressure threshold
    pub fn with_memory_threshold(mut self, threshold: f64) -> Self {
        self.memory_threshold = threshold;
        self
    }

    /// Limit the reconciler to the first `limit` files of each directory;
    /// `0` samples every file
    pub fn with_reconcile_sample_files(mut self, limit: usize) -> Self {
        self.reconcile_sample_files = (limit > 0).then_some(limit);
        self
    }

    /// Disable the progress bar
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ExtractError::Configuration {
                message: "workers must be at least 1".to_string(),
            });
        }
        if !(self.memory_threshold > 0.0 && self.memory_threshold <= 1.0) {
            return Err(ExtractError::Configuration {
                message: format!(
                    "memory threshold must be in (0, 1], got {}",
                    self.memory_threshold
                ),
            });
        }
        Ok(())
    }

    /// Worker count adjusted for current memory pressure
    pub fn effective_workers(&self, profile: &SystemProfile) -> usize {
        let usage = profile.memory_usage();
        if usage > self.memory_threshold {
            let reduced = (self.workers / 2).max(1);
            warn!(
                "Memory usage at {:.0}% exceeds {:.0}%, reducing workers from {} to {}",
                usage * 100.0,
                self.memory_threshold * 100.0,
                self.workers,
                reduced
            );
            reduced
        } else {
            debug!(
                "Using {} workers ({} cores, {}MB memory)",
                self.workers, profile.cpu_cores, profile.memory_mb
            );
            self.workers
        }
    }
}
