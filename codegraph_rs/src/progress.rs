//! CLI progress reporting for indexing runs.
//!
//! Renders a live spinner around one indexing run and formats the outcome
//! from the orchestrator's own result types ([`IndexSummary`],
//! [`StateError`]), so the CLI never re-derives counters by hand.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::orchestrator::{IndexSummary, StateError};

/// Live display for one indexing run.
pub struct IndexProgress {
    bar: ProgressBar,
}

impl IndexProgress {
    pub fn start(workspace: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} ({elapsed})")
                .expect("valid template"),
        );
        bar.set_message(format!("indexing {workspace}"));
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    /// Clear the spinner and print the run summary.
    pub fn finish_summary(&self, summary: &IndexSummary) {
        self.bar.finish_and_clear();
        println!("{} {}", style("✓").green().bold(), summary_line(summary));
    }

    /// Clear the spinner without printing; JSON mode owns the output.
    pub fn finish_quiet(&self) {
        self.bar.finish_and_clear();
    }

    /// Clear the spinner and print the failure plus the retry hint the
    /// state manager attached to it.
    pub fn finish_failure(&self, message: &str, state: Option<&StateError>) {
        self.bar.finish_and_clear();
        eprintln!("{} {message}", style("✗").red().bold());
        if let Some(state) = state {
            eprintln!(
                "  {} {}",
                style("hint:").yellow().bold(),
                state.retry_suggestion
            );
        }
    }
}

/// One-line rendering of a finished run.
pub fn summary_line(summary: &IndexSummary) -> String {
    let mode = if summary.incremental {
        "incremental"
    } else {
        "full"
    };
    format!(
        "{mode} scan: {} files ({} skipped), {} blocks indexed into {} nodes / {} relationships in {}",
        summary.files_scanned,
        summary.files_skipped,
        summary.indexed,
        summary.nodes_created,
        summary.relationships_created,
        human_duration(summary.duration_ms),
    )
}

/// Millisecond durations the way humans read them.
pub fn human_duration(ms: u64) -> String {
    if ms < 1_000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        let secs = ms / 1000;
        format!("{}m{:02}s", secs / 60, secs % 60)
    }
}
