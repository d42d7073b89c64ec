/*
 * watch.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Filesystem watching for live preview.
 */

//! Filesystem watching for live preview
//!
//! Watches a single template file. The file's directory is watched rather
//! than the file itself, since many editors save by writing a new file and
//! renaming it over the old one.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::RecursiveMode;
use notify_debouncer_mini::{DebouncedEvent, Debouncer, new_debouncer};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Default debounce duration for filesystem events (in milliseconds).
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Events emitted by the filesystem watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// The watched file was created, written or replaced.
    Modified(PathBuf),
}

/// Configuration for the filesystem watcher.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

/// Debounced watcher for one file.
pub struct FileWatcher {
    _debouncer: Debouncer<notify::RecommendedWatcher>,
    target: PathBuf,
    event_rx: mpsc::UnboundedReceiver<WatchEvent>,
}

impl FileWatcher {
    pub fn new(file: &Path, config: WatchConfig) -> Result<Self> {
        let target = watch_target(file)?;
        let dir = target
            .parent()
            .map(Path::to_path_buf)
            .context("Watched file has no parent directory")?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let wanted = target.clone();

        let mut debouncer = new_debouncer(
            Duration::from_millis(config.debounce_ms),
            move |res: std::result::Result<Vec<DebouncedEvent>, notify::Error>| match res {
                Ok(events) => {
                    if events.iter().any(|event| event.path == wanted) {
                        debug!(path = %wanted.display(), "File change detected");
                        if event_tx.send(WatchEvent::Modified(wanted.clone())).is_err() {
                            debug!("Event receiver dropped, stopping watcher");
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Filesystem watch error");
                }
            },
        )
        .context("Failed to create filesystem watcher")?;

        debouncer
            .watcher()
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;

        info!(
            path = %target.display(),
            debounce_ms = config.debounce_ms,
            "Watching for changes"
        );

        Ok(Self {
            _debouncer: debouncer,
            target,
            event_rx,
        })
    }

    /// The canonical path being watched.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Receive the next watch event.
    ///
    /// Returns `None` if the watcher has been stopped.
    pub async fn recv(&mut self) -> Option<WatchEvent> {
        self.event_rx.recv().await
    }
}

/// Canonical path of `file`. Only the directory has to exist, so a file
/// that is mid-replacement can still be watched.
fn watch_target(file: &Path) -> Result<PathBuf> {
    let name = file
        .file_name()
        .with_context(|| format!("Not a file path: {}", file.display()))?;
    let dir = match file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let dir = dir
        .canonicalize()
        .with_context(|| format!("Cannot watch {}", dir.display()))?;
    Ok(dir.join(name))
}
