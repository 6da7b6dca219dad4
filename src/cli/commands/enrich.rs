//! The enrich command

use super::shared::{print_field, print_heading};
use crate::cli::args::EnrichArgs;
use crate::enrich::vocabulary::{Vocabularies, VocabularyKind};
use crate::enrich::{EnrichSummary, Enricher};
use anyhow::{Context, Result};
use colored::*;
use tokio::task;

pub async fn run_enrich(args: EnrichArgs) -> Result<()> {
    let request = args.to_request();
    print_heading("Enriching extracted measurements");
    print_field("Input", request.input.display());

    let summary = task::spawn_blocking(move || -> crate::Result<EnrichSummary> {
        let vocabularies = Vocabularies::load_from_dir(&request.vocab_dir, &VocabularyKind::COMMON);
        Enricher::new(&vocabularies)?.run(&request)
    })
    .await
    .context("enrich worker failed")??;

    print_enrich_summary(&summary, &args.output.display().to_string());
    Ok(())
}

pub fn print_enrich_summary(summary: &EnrichSummary, output: &str) {
    print_heading("Enrichment summary");
    print_field("Rows", format!("{} in, {} out", summary.input_rows, summary.output_rows));
    if !summary.dropped_uuid_columns.is_empty() {
        print_field("Dropped UUID columns", summary.dropped_uuid_columns.join(", "));
    }
    if let Some(rows) = summary.rows_with_station_metadata {
        print_field("Rows with station metadata", rows);
    }
    print_field("Rows with pollutant name", summary.rows_with_pollutant_name);
    print_field("Rows with pollutant code", summary.rows_with_pollutant_code);

    if !summary.pollutants.is_empty() {
        println!("  {}", "Pollutants:".bright_cyan());
        for pollutant in &summary.pollutants {
            println!(
                "    {} -> {} ({})",
                pollutant.code,
                pollutant.notation.as_deref().unwrap_or("?"),
                pollutant.name.as_deref().unwrap_or("unknown")
            );
        }
    }
    print_field("Output", output.bright_white().bold());
}
