//! EEA air quality extraction library
//!
//! Extracts measurements for the monitoring stations inside a bounding box
//! from downloaded EEA parquet archives. Station identifiers in the
//! measurement files and in the station metadata table follow different
//! encodings; both are reduced to one normalized key before matching.
//!
//! This library provides tools for:
//! - Normalizing sampling-point identifiers to station keys
//! - Loading the station registry and selecting stations by bounding box
//! - Scanning measurement files concurrently with pollutant and time filters
//! - Reconciling registry keys against the keys found in the files
//! - Enriching extracted tables with station metadata and vocabulary labels

pub mod config;
pub mod constants;
pub mod enrich;
pub mod error;
pub mod filters;
pub mod frame;
pub mod inspect;
pub mod models;
pub mod normalizer;
pub mod processor;
pub mod reconciler;
pub mod registry;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

pub use config::ExtractConfig;
pub use error::{ExtractError, Result};
pub use models::{BoundingBox, StationRecord, TimeRange};
pub use normalizer::IdentifierNormalizer;
pub use processor::{ExtractRequest, ExtractionProcessor, RunMode, RunOutcome};
pub use registry::StationRegistry;
