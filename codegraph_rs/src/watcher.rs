//! Watch mode: debounced file-change events trigger incremental re-index.
//!
//! Runs as a blocking loop on its own thread; async re-index calls go back
//! into the runtime through a handle. Shutdown is cooperative via the
//! orchestrator's watcher flag.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{RecvTimeoutError, channel};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{DebounceEventResult, Debouncer, RecommendedCache, new_debouncer};
use tracing::{info, warn};

use crate::orchestrator::IndexOrchestrator;

/// Watch configuration.
pub struct WatchConfig {
    pub root: PathBuf,
    /// Debounce window before a re-index fires.
    pub debounce: Duration,
    /// File extensions to react to (empty = all).
    pub extensions: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            debounce: Duration::from_millis(500),
            extensions: Vec::new(),
        }
    }
}

/// Watch for changes and re-index incrementally until the orchestrator's
/// watcher flag is cleared.
///
/// Call from a blocking thread; `handle` drives the async re-index.
pub fn watch_and_reindex(
    orchestrator: Arc<IndexOrchestrator>,
    config: WatchConfig,
    handle: tokio::runtime::Handle,
) -> anyhow::Result<()> {
    let (tx, rx) = channel();

    let mut debouncer: Debouncer<RecommendedWatcher, RecommendedCache> =
        new_debouncer(config.debounce, None, move |result: DebounceEventResult| {
            if let Err(e) = tx.send(result) {
                warn!("[codegraph][warn] watch event channel closed: {e}");
            }
        })?;

    debouncer
        .watch(&config.root, RecursiveMode::Recursive)
        .map_err(|e| anyhow::anyhow!("failed to watch {}: {e}", config.root.display()))?;

    orchestrator.set_watcher_active(true);
    info!(root = %config.root.display(), "watching for changes");

    loop {
        if !orchestrator.is_watcher_active() {
            info!("watcher stopped");
            return Ok(());
        }
        match rx.recv_timeout(Duration::from_millis(250)) {
            Ok(Ok(events)) => {
                let changed = collect_changed_paths(&events, &config.extensions);
                if changed.is_empty() {
                    continue;
                }
                info!(files = changed.len(), "change detected; re-indexing");
                let orch = Arc::clone(&orchestrator);
                if let Err(e) = handle.block_on(async move { orch.start_indexing().await }) {
                    warn!("[codegraph][warn] re-index failed: {e}");
                }
            }
            Ok(Err(errors)) => {
                for error in errors {
                    warn!("[codegraph][warn] watch error: {error}");
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                warn!("[codegraph][warn] watch channel disconnected");
                return Ok(());
            }
        }
    }
}

/// Paths worth re-indexing from a debounced event batch.
fn collect_changed_paths(
    events: &[notify_debouncer_full::DebouncedEvent],
    extensions: &[String],
) -> HashSet<PathBuf> {
    let mut paths = HashSet::new();
    for event in events {
        for path in &event.paths {
            if path.is_dir() {
                continue;
            }
            if !extensions.is_empty() {
                let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                    continue;
                };
                if !extensions.iter().any(|e| e == ext) {
                    continue;
                }
            }
            paths.insert(path.clone());
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_debounce_contract() {
        let config = WatchConfig::default();
        assert_eq!(config.debounce, Duration::from_millis(500));
        assert_eq!(config.root, PathBuf::from("."));
        assert!(config.extensions.is_empty());
    }

    #[test]
    fn custom_config_holds() {
        let config = WatchConfig {
            root: PathBuf::from("src"),
            debounce: Duration::from_millis(250),
            extensions: vec!["ts".to_string(), "rs".to_string()],
        };
        assert_eq!(config.extensions.len(), 2);
        assert_eq!(config.debounce, Duration::from_millis(250));
    }
}
