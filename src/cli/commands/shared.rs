//! Helpers shared by the command implementations

use anyhow::{Result, anyhow};
use colored::*;
use std::time::Duration;
use tracing::debug;

/// Install the tracing subscriber. `RUST_LOG` overrides `level`.
pub fn setup_logging(level: &str) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("eea_extract={}", level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {}", e))?;

    debug!("Logging initialized at level: {}", level);
    Ok(())
}

/// Print a section title
pub fn print_heading(title: &str) {
    println!("\n{}", title.bright_green().bold());
}

/// Print one `label: value` line of a summary
pub fn print_field(label: &str, value: impl std::fmt::Display) {
    println!("  {} {}", format!("{}:", label).bright_cyan(), value);
}

/// Print up to `limit` items, then how many were left out
pub fn print_sample<'a, I>(label: &str, items: I, total: usize, limit: usize)
where
    I: IntoIterator<Item = &'a String>,
{
    if total == 0 {
        return;
    }
    let shown: Vec<&str> = items.into_iter().take(limit).map(String::as_str).collect();
    let more = if total > shown.len() {
        format!(" (+{} more)", total - shown.len())
    } else {
        String::new()
    };
    print_field(label, format!("{}{}", shown.join(", "), more.dimmed()));
}

/// Format a duration as `1.234s` or `2m 03s`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1234)), "1.234s");
        assert_eq!(format_duration(Duration::from_secs(123)), "2m 03s");
    }
}
