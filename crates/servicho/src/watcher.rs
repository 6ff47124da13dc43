//! Recursive file system watcher for live reload.
//!
//! Watches the served root and turns notify events into [`ChangeEvent`]s on a
//! channel. Hidden paths (any segment starting with `.`) never produce an
//! event, so editor swap files and `.git` churn do not reload the browser.

use crate::error::{Result, ServeError};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

const CHANNEL_CAPACITY: usize = 100;

/// What happened to a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    /// The path was created, modified or removed
    Modified,
    /// The watcher reported an error; the stream keeps going
    Error(String),
}

/// A single observation from the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Modified,
        }
    }

    pub fn error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Error(message.into()),
        }
    }

    pub fn is_modified(&self) -> bool {
        matches!(self.kind, ChangeKind::Modified)
    }
}

/// Knobs for [`ChangeWatcher`].
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    /// Extra patterns to ignore: `*.ext` suffixes or path-segment prefixes
    pub ignore_patterns: Vec<String>,
    /// Drop repeat events for the same path inside this window
    pub debounce: Duration,
}

/// File watcher with filtering and optional debouncing.
///
/// Dropping the `ChangeWatcher` stops the underlying notify watcher and
/// closes the event channel.
pub struct ChangeWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl ChangeWatcher {
    /// Start watching `root` recursively.
    ///
    /// # Returns
    ///
    /// Tuple of (ChangeWatcher, receiver for change events)
    ///
    /// # Errors
    ///
    /// Returns [`ServeError::WatcherSetup`] if the root does not exist or the
    /// platform watcher cannot be created.
    pub fn new(
        root: PathBuf,
        options: WatchOptions,
    ) -> Result<(Self, mpsc::Receiver<ChangeEvent>)> {
        if !root.exists() {
            return Err(ServeError::WatcherSetup {
                source: notify::Error::path_not_found().add_path(root.clone()),
                path: root,
            });
        }

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        let WatchOptions {
            ignore_patterns,
            debounce,
        } = options;
        let mut last_event: Option<(PathBuf, Instant)> = None;
        let root_clone = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    let path = err.paths.first().cloned().unwrap_or_else(|| root_clone.clone());
                    forward(&tx, ChangeEvent::error(path, err.to_string()));
                    return;
                }
            };

            if !matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) {
                return;
            }

            for path in &event.paths {
                if Self::should_ignore(path, &root_clone, &ignore_patterns) {
                    continue;
                }

                // Debounce: skip if same file changed within debounce window
                let now = Instant::now();
                if let Some((last_path, last_time)) = &last_event {
                    if last_path == path && now.duration_since(*last_time) < debounce {
                        continue;
                    }
                }
                last_event = Some((path.clone(), now));

                forward(&tx, ChangeEvent::modified(path.clone()));
            }
        })
        .map_err(|source| ServeError::WatcherSetup {
            path: root.clone(),
            source,
        })?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|source| ServeError::WatcherSetup {
                path: root.clone(),
                source,
            })?;

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    /// Check if a path should be ignored.
    ///
    /// Paths outside `root`, hidden paths and paths matching an ignore
    /// pattern are ignored.
    pub fn should_ignore(path: &Path, root: &Path, ignore_patterns: &[String]) -> bool {
        let rel_path = match path.strip_prefix(root) {
            Ok(p) => p,
            Err(_) => return true,
        };

        for component in rel_path.components() {
            if let Some(name) = component.as_os_str().to_str() {
                if name.starts_with('.') && name != "." && name != ".." {
                    return true;
                }
            }
        }

        let path_str = rel_path.to_string_lossy();
        ignore_patterns.iter().any(|pattern| {
            if let Some(suffix) = pattern.strip_prefix('*') {
                path_str.ends_with(suffix)
            } else {
                path_str.starts_with(pattern.as_str())
                    || path_str.contains(&format!("/{}", pattern))
            }
        })
    }

    /// Get the root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Send without blocking the notify thread.
///
/// Reload is idempotent, so a full queue already holds enough events.
fn forward(tx: &mpsc::Sender<ChangeEvent>, event: ChangeEvent) {
    match tx.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(event)) => {
            tracing::debug!(path = %event.path.display(), "change queue full, dropping event");
        }
        Err(TrySendError::Closed(_)) => {}
    }
}
