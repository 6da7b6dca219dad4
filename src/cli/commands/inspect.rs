//! The inspect command

use super::shared::{print_field, print_heading};
use crate::cli::args::InspectArgs;
use crate::inspect::{FileInspection, InspectEntry, InspectReport, inspect_directory};
use crate::normalizer::IdentifierNormalizer;
use anyhow::{Context, Result};
use colored::*;
use tokio::task;

pub async fn run_inspect(args: InspectArgs) -> Result<()> {
    let report = task::spawn_blocking(move || -> crate::Result<InspectReport> {
        let normalizer = IdentifierNormalizer::new()?;
        inspect_directory(&args.dir, args.sample, args.recursive, &normalizer)
    })
    .await
    .context("inspect worker failed")??;

    print_inspect_report(&report);
    Ok(())
}

pub fn print_inspect_report(report: &InspectReport) {
    print_heading(&format!("Inspecting {}", report.directory.display()));
    print_field(
        "Parquet files",
        format!("{} found, {} inspected", report.files_found, report.entries.len()),
    );

    for entry in &report.entries {
        match entry {
            InspectEntry::Inspected(inspection) => print_inspection(inspection),
            InspectEntry::Unreadable { path, reason } => {
                println!("\n{}", path.display().to_string().bold());
                println!("  {} {}", "Unreadable:".bright_red(), reason);
            }
        }
    }
}

fn print_inspection(inspection: &FileInspection) {
    println!("\n{}", inspection.path.display().to_string().bold());
    print_field(
        "Shape",
        format!("{} rows x {} columns", inspection.rows, inspection.columns.len()),
    );
    println!("  {}", "Columns:".bright_cyan());
    for column in &inspection.columns {
        println!("    {:<24} {}", column.name, column.dtype.dimmed());
    }
    for (name, values) in &inspection.distinct_values {
        print_field(&format!("First distinct {}", name), values.join(", "));
    }
    if !inspection.key_examples.is_empty() {
        println!("  {}", "Normalized keys:".bright_cyan());
        for (raw, key) in &inspection.key_examples {
            println!("    {} -> {}", raw, key.bright_white());
        }
    }
}
