//! Error handling for EEA extraction operations.
//!
//! Run-level failures (registry, configuration, bounding box) are fatal and
//! surface as [`ExtractError`]. Failures confined to a single measurement file
//! are not errors at this level: they become skip diagnostics, see
//! [`crate::models::FileOutcome`].

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("File not found: {path}")]
    MissingFile { path: PathBuf },

    #[error("Input directory not found: {path}")]
    MissingDirectory { path: PathBuf },

    #[error("File {path} is missing required columns: {}", missing.join(", "))]
    SchemaError { path: PathBuf, missing: Vec<String> },

    #[error("Invalid bounding box: {reason}")]
    InvalidBoundingBox { reason: String },

    #[error("Invalid time range: {reason}")]
    InvalidTimeRange { reason: String },

    #[error("Invalid date '{value}': expected YYYY-MM-DD, YYYY-MM-DD HH:MM:SS or RFC 3339")]
    InvalidDate { value: String },

    #[error("Unreadable file: {path} - {reason}")]
    UnreadableFile { path: PathBuf, reason: String },

    #[error("Invalid identifier pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Vocabulary error in {path}: {reason}")]
    Vocabulary { path: PathBuf, reason: String },

    #[error("Processing failed for {path}: {reason}")]
    ProcessingFailed { path: PathBuf, reason: String },

    #[error("Processing interrupted: {reason}")]
    Interrupted { reason: String },
}

impl ExtractError {
    /// Create an unreadable-file error from any displayable cause
    pub fn unreadable(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::UnreadableFile {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid bounding box error
    pub fn invalid_bbox(reason: impl Into<String>) -> Self {
        Self::InvalidBoundingBox {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
