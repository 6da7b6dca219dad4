//! Command-line argument definitions for eea-extract
//!
//! The complete CLI surface, using the clap derive API. Argument structs know
//! how to turn themselves into the library's request and configuration types.

use crate::config::ExtractConfig;
use crate::constants::{
    DEFAULT_BBOX, DEFAULT_ENRICHED_OUTPUT_PATH, DEFAULT_INPUT_DIRS, DEFAULT_INSPECT_SAMPLE,
    DEFAULT_METADATA_PATH, DEFAULT_OUTPUT_PATH, DEFAULT_RECONCILE_SAMPLE_FILES,
    DEFAULT_VOCABULARY_DIR,
};
use crate::enrich::EnrichRequest;
use crate::processor::{ExtractRequest, RunMode};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Extract EEA air quality measurements for the stations inside a bounding box
#[derive(Debug, Clone, Parser)]
#[command(
    name = "eea-extract",
    version,
    about = "Extract EEA air quality measurements for stations inside a bounding box",
    long_about = "Matches the sampling points of downloaded EEA measurement files against the \
                  station metadata table, keeps the stations inside a bounding box and writes \
                  the matching measurements to a single CSV. Also enriches extracted files \
                  with station metadata and vocabulary labels, and inspects raw files."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Logging verbosity
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase logging verbosity (-v: debug, -vv: trace)"
    )]
    pub verbose: u8,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Extract measurements for the stations inside a bounding box
    Extract(ExtractArgs),
    /// Add station metadata and vocabulary labels to an extracted CSV
    Enrich(EnrichArgs),
    /// Show the structure of a few measurement files
    Inspect(InspectArgs),
}

#[derive(Debug, Clone, Parser)]
pub struct ExtractArgs {
    /// Directories holding the downloaded parquet files, scanned in order
    #[arg(
        long = "indir",
        value_name = "DIR",
        num_args = 1..,
        default_values = DEFAULT_INPUT_DIRS.iter().copied()
    )]
    pub input_dirs: Vec<PathBuf>,

    /// Station metadata CSV
    #[arg(long = "metadata", value_name = "PATH", default_value = DEFAULT_METADATA_PATH)]
    pub metadata: PathBuf,

    /// Output CSV
    #[arg(long = "out", value_name = "PATH", default_value = DEFAULT_OUTPUT_PATH)]
    pub output: PathBuf,

    /// Bounding box as four numbers
    #[arg(
        long = "bbox",
        num_args = 4,
        value_names = ["MIN_LON", "MAX_LON", "MIN_LAT", "MAX_LAT"],
        allow_negative_numbers = true,
        default_values_t = DEFAULT_BBOX
    )]
    pub bbox: Vec<f64>,

    /// Pollutant names (NO2, PM10, ...) or numeric codes
    #[arg(long = "pollutants", value_name = "TOKEN", num_args = 1.., value_delimiter = ',')]
    pub pollutants: Vec<String>,

    /// Keep measurements whose interval ends on or after this date
    #[arg(long = "start", value_name = "DATE")]
    pub start: Option<String>,

    /// Keep measurements whose interval starts on or before this date
    #[arg(long = "end", value_name = "DATE")]
    pub end: Option<String>,

    /// Report match statistics without writing the output file
    #[arg(long = "check")]
    pub check: bool,

    /// Compare registry keys with the keys used in the files
    #[arg(long = "debug-ids", conflicts_with = "check")]
    pub debug_ids: bool,

    /// Number of files scanned concurrently
    #[arg(short = 'j', long = "workers", value_name = "COUNT")]
    pub workers: Option<usize>,

    /// Files sampled per directory by --debug-ids (0 scans every file)
    #[arg(
        long = "sample-files",
        value_name = "COUNT",
        default_value_t = DEFAULT_RECONCILE_SAMPLE_FILES
    )]
    pub sample_files: usize,

    /// Vocabulary directory used to resolve pollutant names missing from the built-in table
    #[arg(long = "vocab-dir", value_name = "DIR")]
    pub vocab_dir: Option<PathBuf>,

    /// Disable the progress bar
    #[arg(long = "no-progress")]
    pub no_progress: bool,
}

impl ExtractArgs {
    pub fn mode(&self) -> RunMode {
        if self.debug_ids {
            RunMode::DebugIds
        } else if self.check {
            RunMode::Check
        } else {
            RunMode::Extract
        }
    }

    pub fn to_request(&self) -> ExtractRequest {
        ExtractRequest {
            input_dirs: self.input_dirs.clone(),
            metadata_path: self.metadata.clone(),
            output_path: self.output.clone(),
            bbox: self.bbox.clone(),
            pollutants: self.pollutants.clone(),
            start: self.start.clone(),
            end: self.end.clone(),
            vocab_dir: self.vocab_dir.clone(),
        }
    }

    pub fn to_config(&self) -> ExtractConfig {
        let mut config =
            ExtractConfig::default().with_reconcile_sample_files(self.sample_files);
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if self.no_progress {
            config = config.without_progress();
        }
        config
    }
}

#[derive(Debug, Clone, Parser)]
pub struct EnrichArgs {
    /// Extracted CSV to enrich
    #[arg(long = "input", value_name = "PATH")]
    pub input: PathBuf,

    /// Enriched CSV
    #[arg(long = "output", value_name = "PATH", default_value = DEFAULT_ENRICHED_OUTPUT_PATH)]
    pub output: PathBuf,

    /// Station metadata CSV
    #[arg(long = "metadata", value_name = "PATH", default_value = DEFAULT_METADATA_PATH)]
    pub metadata: PathBuf,

    /// Directory holding pollutant.json, unit.json, ...
    #[arg(long = "vocab-dir", value_name = "DIR", default_value = DEFAULT_VOCABULARY_DIR)]
    pub vocab_dir: PathBuf,
}

impl EnrichArgs {
    pub fn to_request(&self) -> EnrichRequest {
        EnrichRequest {
            input: self.input.clone(),
            output: self.output.clone(),
            metadata: self.metadata.clone(),
            vocab_dir: self.vocab_dir.clone(),
        }
    }
}

#[derive(Debug, Clone, Parser)]
pub struct InspectArgs {
    /// Directory of parquet files
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Number of files to inspect
    #[arg(long = "sample", value_name = "COUNT", default_value_t = DEFAULT_INSPECT_SAMPLE)]
    pub sample: usize,

    /// Include files in subdirectories
    #[arg(long = "recursive")]
    pub recursive: bool,
}

impl Args {
    /// Log level for the verbosity count
    pub fn get_log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(args).unwrap()
    }

    fn extract_args(args: &[&str]) -> ExtractArgs {
        match parse(args).command {
            Some(Commands::Extract(extract)) => extract,
            other => panic!("expected extract command, got {other:?}"),
        }
    }

    #[test]
    fn test_extract_defaults() {
        let args = extract_args(&["eea-extract", "extract"]);

        assert_eq!(
            args.input_dirs,
            vec![PathBuf::from("eea_hourly"), PathBuf::from("eea_daily")]
        );
        assert_eq!(args.metadata, PathBuf::from(DEFAULT_METADATA_PATH));
        assert_eq!(args.output, PathBuf::from(DEFAULT_OUTPUT_PATH));
        assert_eq!(args.bbox, DEFAULT_BBOX.to_vec());
        assert!(args.pollutants.is_empty());
        assert_eq!(args.mode(), RunMode::Extract);
        assert_eq!(args.sample_files, DEFAULT_RECONCILE_SAMPLE_FILES);
    }

    #[test]
    fn test_extract_with_negative_bbox_and_pollutants() {
        let args = extract_args(&[
            "eea-extract",
            "extract",
            "--bbox",
            "-10.5",
            "-2",
            "50",
            "55.5",
            "--pollutants",
            "NO2",
            "PM10,5",
            "--check",
        ]);

        assert_eq!(args.bbox, vec![-10.5, -2.0, 50.0, 55.5]);
        assert_eq!(args.pollutants, vec!["NO2", "PM10", "5"]);
        assert_eq!(args.mode(), RunMode::Check);

        let request = args.to_request();
        assert_eq!(request.bbox, vec![-10.5, -2.0, 50.0, 55.5]);
        assert_eq!(request.pollutants.len(), 3);
    }

    #[test]
    fn test_bbox_needs_four_values() {
        assert!(Args::try_parse_from(["eea-extract", "extract", "--bbox", "1", "2", "3"]).is_err());
    }

    #[test]
    fn test_check_conflicts_with_debug_ids() {
        assert!(Args::try_parse_from(["eea-extract", "extract", "--check", "--debug-ids"]).is_err());
    }

    #[test]
    fn test_extract_config_overrides() {
        let args = extract_args(&[
            "eea-extract",
            "extract",
            "--workers",
            "3",
            "--sample-files",
            "0",
            "--no-progress",
        ]);
        let config = args.to_config();

        assert_eq!(config.workers, 3);
        assert_eq!(config.reconcile_sample_files, None);
        assert!(!config.show_progress);
    }

    #[test]
    fn test_enrich_requires_input() {
        assert!(Args::try_parse_from(["eea-extract", "enrich"]).is_err());

        match parse(&["eea-extract", "enrich", "--input", "eea_bbox.csv"]).command {
            Some(Commands::Enrich(enrich)) => {
                let request = enrich.to_request();
                assert_eq!(request.input, PathBuf::from("eea_bbox.csv"));
                assert_eq!(request.output, PathBuf::from(DEFAULT_ENRICHED_OUTPUT_PATH));
                assert_eq!(request.vocab_dir, PathBuf::from(DEFAULT_VOCABULARY_DIR));
            }
            other => panic!("expected enrich command, got {other:?}"),
        }
    }

    #[test]
    fn test_inspect_arguments() {
        match parse(&["eea-extract", "inspect", "eea_hourly", "--sample", "2", "--recursive"]).command {
            Some(Commands::Inspect(inspect)) => {
                assert_eq!(inspect.dir, PathBuf::from("eea_hourly"));
                assert_eq!(inspect.sample, 2);
                assert!(inspect.recursive);
            }
            other => panic!("expected inspect command, got {other:?}"),
        }
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(parse(&["eea-extract", "inspect", "d"]).get_log_level(), "info");
        assert_eq!(parse(&["eea-extract", "-v", "inspect", "d"]).get_log_level(), "debug");
        assert_eq!(parse(&["eea-extract", "inspect", "d", "-vv"]).get_log_level(), "trace");
    }
}
