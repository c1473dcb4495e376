//! Output formatting utilities

use crate::OutputFormat;
use artsync_types::RunSummary;
use console::style;

/// Failed paths shown inline in the summary; the rest are counted.
const MAX_FAILURES_SHOWN: usize = 20;

/// Format bytes as human-readable
pub fn format_bytes(bytes: u64) -> String {
    human_bytes::human_bytes(bytes as f64)
}

/// Format a millisecond duration as human-readable
pub fn format_elapsed(ms: u64) -> String {
    let seconds = ms / 1000;
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

pub fn print_summary(summary: &RunSummary, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(summary)?),
        OutputFormat::Human => {
            let headline = if summary.is_clean() {
                style("Synchronization complete").green().bold()
            } else {
                style("Synchronization finished with failures").red().bold()
            };
            println!("\n{headline}");
            println!("  processed:     {}/{}", summary.processed(), summary.total);
            println!("  succeeded:     {}", summary.succeeded);
            println!("  skipped:       {}", summary.skipped);
            println!("  failed:        {}", summary.failed);
            if summary.not_attempted > 0 {
                println!("  not attempted: {}", summary.not_attempted);
            }
            println!("  transferred:   {}", format_bytes(summary.bytes_transferred));
            println!("  elapsed:       {}", format_elapsed(summary.elapsed_ms));

            if !summary.failed_paths.is_empty() {
                println!("\nFailed artifacts:");
                for failure in summary.failed_paths.iter().take(MAX_FAILURES_SHOWN) {
                    println!("  {} {} ({})", style("✗").red(), failure.path, failure.reason);
                }
                if summary.failed_paths.len() > MAX_FAILURES_SHOWN {
                    println!(
                        "  ... and {} more",
                        summary.failed_paths.len() - MAX_FAILURES_SHOWN
                    );
                }
            }
        }
    }
    Ok(())
}
