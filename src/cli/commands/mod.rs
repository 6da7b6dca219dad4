//! Command implementations for the eea-extract CLI
//!
//! Each subcommand lives in its own module; this module only dispatches.

pub mod enrich;
pub mod extract;
pub mod inspect;
pub mod shared;

use crate::cli::args::{Args, Commands};
use anyhow::Result;
use tokio_util::sync::CancellationToken;

/// Run the subcommand selected in `args`
pub async fn run(args: Args, cancel: CancellationToken) -> Result<()> {
    shared::setup_logging(args.get_log_level())?;

    match args.command {
        Some(Commands::Extract(extract_args)) => extract::run_extract(extract_args, cancel).await,
        Some(Commands::Enrich(enrich_args)) => enrich::run_enrich(enrich_args).await,
        Some(Commands::Inspect(inspect_args)) => inspect::run_inspect(inspect_args).await,
        None => Ok(()),
    }
}
