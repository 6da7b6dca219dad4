//! The extract command: bounding-box extraction, check mode and identifier
//! reconciliation

use super::shared::{format_duration, print_field, print_heading, print_sample};
use crate::cli::args::ExtractArgs;
use crate::processor::aggregator::MatchReport;
use crate::processor::{ExtractionProcessor, RunMode, RunOutcome};
use crate::reconciler::ReconcileReport;
use anyhow::Result;
use colored::*;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Keys listed per category before eliding the rest
const LISTED_KEYS: usize = 10;

pub async fn run_extract(args: ExtractArgs, cancel: CancellationToken) -> Result<()> {
    let mode = args.mode();
    let processor = ExtractionProcessor::new(args.to_request(), args.to_config())?;

    print_heading("EEA bounding-box extraction");
    print_field("Bounding box", processor.bbox());
    if let Some(filter) = processor.pollutant_filter() {
        let codes: Vec<String> = filter.codes().iter().map(|code| code.match_key()).collect();
        print_field("Pollutant codes", codes.join(", "));
    }
    info!("Running in {:?} mode", mode);

    let outcome = processor.run(mode, &cancel).await?;
    print_outcome(&outcome);
    Ok(())
}

pub fn print_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::NoTargetStations => {
            println!(
                "\n{}",
                "No stations found in the specified bounding box.".bright_yellow()
            );
        }
        RunOutcome::Checked(report) => {
            print_heading("Match check");
            print_match_report(report);
        }
        RunOutcome::Extracted { stats, report } => {
            match &stats.output_path {
                Some(path) => {
                    print_heading("Extraction summary");
                    print_match_report(report);
                    print_field(
                        "Output",
                        path.display().to_string().bright_white().bold(),
                    );
                }
                None => {
                    println!(
                        "\n{}",
                        "No data found for the specified filters.".bright_yellow()
                    );
                    print_field("Target stations", stats.target_stations);
                    print_field("Files scanned", stats.files_scanned);
                }
            }
            print_field(
                "Processing time",
                format_duration(Duration::from_millis(stats.processing_time_ms as u64)),
            );
        }
        RunOutcome::Reconciled(report) => print_reconcile_report(report),
    }
}

fn print_match_report(report: &MatchReport) {
    println!("  {}", report.summary_line().bright_white().bold());
    print_field("Rows", report.total_rows);
    print_field(
        "Files",
        format!(
            "{} scanned, {} with matches",
            report.files_scanned, report.files_with_matches
        ),
    );
    if !report.pollutants.is_empty() {
        let pollutants: Vec<&str> = report.pollutants.iter().map(String::as_str).collect();
        print_field("Pollutants", pollutants.join(", "));
    }
    print_sample(
        "Unmatched stations",
        &report.unmatched_stations,
        report.unmatched_stations.len(),
        LISTED_KEYS,
    );
    if !report.skipped.is_empty() {
        println!(
            "  {} {}",
            "Skipped files:".bright_red(),
            report.skipped.len().to_string().bright_red().bold()
        );
        for skipped in &report.skipped {
            println!("    {} ({})", skipped.path.display(), skipped.reason);
        }
    }
}

pub fn print_reconcile_report(report: &ReconcileReport) {
    print_heading("Identifier reconciliation");
    print_field("Registry keys in bounding box", report.registry_keys);
    print_field("Keys found in files", report.source_keys);
    print_field(
        "Common keys",
        report.intersection.len().to_string().bright_white().bold(),
    );

    for directory in &report.directories {
        println!(
            "  {} {} sampled, {} skipped, {} distinct keys, {} matches",
            format!("{}:", directory.directory.display()).bright_cyan(),
            directory.files_sampled,
            directory.files_skipped,
            directory.distinct_keys,
            directory.matches
        );
    }

    print_sample(
        "Common",
        &report.intersection,
        report.intersection.len(),
        LISTED_KEYS,
    );
    print_sample(
        "Only in registry",
        &report.registry_only,
        report.registry_only.len(),
        LISTED_KEYS,
    );
    print_sample(
        "Only in files",
        &report.source_only,
        report.source_only.len(),
        LISTED_KEYS,
    );
}
