//! File discovery module for EEA measurement directories
//!
//! Lists the parquet files of each input directory. Files within a directory
//! are returned in lexicographic order and directories keep the order they
//! were given in, which fixes the scan order of a run.

use crate::constants::MEASUREMENT_FILE_EXTENSION;
use crate::error::{ExtractError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// One input directory and the measurement files found in it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDirectory {
    pub path: PathBuf,
    pub files: Vec<PathBuf>,
}

impl SourceDirectory {
    /// Keep only the first `limit` files
    pub fn sampled(&self, limit: Option<usize>) -> &[PathBuf] {
        match limit {
            Some(limit) => &self.files[..limit.min(self.files.len())],
            None => &self.files,
        }
    }
}

/// File discovery component for measurement directories
#[derive(Debug)]
pub struct FileDiscovery {
    directories: Vec<PathBuf>,
}

impl FileDiscovery {
    /// Create a new file discovery instance
    pub fn new(directories: Vec<PathBuf>) -> Self {
        Self { directories }
    }

    /// Fail with `MissingDirectory` if any input directory is absent
    pub fn ensure_directories_exist(&self) -> Result<()> {
        for directory in &self.directories {
            if !directory.is_dir() {
                return Err(ExtractError::MissingDirectory {
                    path: directory.clone(),
                });
            }
        }
        Ok(())
    }

    /// Discover the parquet files of every directory.
    ///
    /// Only the top level of each directory is listed.
    pub async fn discover(&self) -> Result<Vec<SourceDirectory>> {
        self.ensure_directories_exist()?;

        let mut found = Vec::with_capacity(self.directories.len());
        for directory in &self.directories {
            let files = discover_directory_files(directory).await?;
            debug!(
                "Found {} measurement files in {}",
                files.len(),
                directory.display()
            );
            found.push(SourceDirectory {
                path: directory.clone(),
                files,
            });
        }

        Ok(found)
    }
}

/// List measurement files directly inside `directory`, sorted by name
async fn discover_directory_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut dir = fs::read_dir(directory).await?;

    while let Some(entry) = dir.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file() && is_measurement_file(&path) {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Check if a path is a measurement file
pub fn is_measurement_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == MEASUREMENT_FILE_EXTENSION)
}
