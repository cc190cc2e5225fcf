//! File system change detection for dev sessions.
//!
//! Watches every configured root recursively and turns `notify` events into
//! [`ChangeEvent`]s, dropping ignored paths (dependencies, VCS metadata, hidden
//! files, the output directory) before they reach the session.

use crate::config::{default_watch_ignore, KilnConfig};
use crate::error::Result;
use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Kind of change observed on a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
    DirAdded,
    DirRemoved,
}

/// One relevant file system change.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub timestamp: Instant,
}

/// Lifecycle and events of a [`ChangeDetector`].
#[derive(Debug, Clone)]
pub enum WatchSignal {
    /// Roots are registered; changes from here on are real
    Ready,
    /// A relevant change
    Change(ChangeEvent),
    /// The watcher reported an error
    Error(String),
}

/// Which paths never produce change events.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    roots: Vec<PathBuf>,
    patterns: Vec<String>,
    dirs: Vec<PathBuf>,
}

impl IgnoreRules {
    /// Rules for paths under `roots`, ignoring `patterns`.
    ///
    /// `*.ext` patterns match suffixes. Bare names match whole path segments;
    /// a name with `/` in it matches that run of segments.
    pub fn new(roots: Vec<PathBuf>, patterns: Vec<String>) -> Self {
        Self {
            roots,
            patterns,
            dirs: Vec::new(),
        }
    }

    /// Also ignore everything under `dir`.
    pub fn with_dir(mut self, dir: PathBuf) -> Self {
        self.dirs.push(dir);
        self
    }

    /// Rules for a project: default patterns, `watch.ignore` and the output
    /// directory.
    pub fn from_config(config: &KilnConfig) -> Self {
        let mut patterns = default_watch_ignore();
        patterns.extend(config.watch.ignore.iter().cloned());

        let roots = config.watch_roots().iter().map(|r| normalize(r)).collect();
        Self::new(roots, patterns).with_dir(normalize(&config.out_path()))
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Check if a path should be ignored.
    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.dirs.iter().any(|dir| path.starts_with(dir)) {
            return true;
        }

        // Only paths inside a watched root count
        let Some(rel_path) = self
            .roots
            .iter()
            .find_map(|root| path.strip_prefix(root).ok())
        else {
            return true;
        };

        let path_str = rel_path.to_string_lossy();
        let segments: Vec<_> = rel_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect();

        for pattern in &self.patterns {
            if let Some(ext) = pattern.strip_prefix('*') {
                if path_str.ends_with(ext) {
                    return true;
                }
                continue;
            }

            let wanted: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
            if wanted.is_empty() {
                continue;
            }
            if segments
                .windows(wanted.len())
                .any(|run| run.iter().zip(&wanted).all(|(have, want)| have == want))
            {
                return true;
            }
        }

        rel_path.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
        })
    }
}

/// Recursive watcher over one or more roots.
///
/// Dropping the detector stops watching; the signal stream then ends.
pub struct ChangeDetector {
    _watcher: RecommendedWatcher,
    roots: Vec<PathBuf>,
}

impl std::fmt::Debug for ChangeDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeDetector")
            .field("roots", &self.roots)
            .finish_non_exhaustive()
    }
}

impl ChangeDetector {
    /// Start watching `roots`.
    ///
    /// The stream yields [`WatchSignal::Ready`] once every root has been
    /// registered, then changes. Anything `notify` reports before that is
    /// initial-scan noise and is dropped. A root that cannot be watched is
    /// logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns error if the platform watcher cannot be created
    pub fn start(
        roots: Vec<PathBuf>,
        rules: IgnoreRules,
    ) -> Result<(Self, ReceiverStream<WatchSignal>)> {
        let (tx, rx) = mpsc::channel(100);
        let ready = Arc::new(AtomicBool::new(false));

        let callback_tx = tx.clone();
        let callback_ready = Arc::clone(&ready);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if !callback_ready.load(Ordering::Acquire) {
                return;
            }

            match res {
                Ok(event) => {
                    for path in &event.paths {
                        if rules.is_ignored(path) {
                            continue;
                        }
                        let Some(kind) = classify(&event.kind, path) else {
                            continue;
                        };
                        let change = ChangeEvent {
                            path: path.clone(),
                            kind,
                            timestamp: Instant::now(),
                        };
                        // Receiver gone means the session is over
                        if callback_tx.blocking_send(WatchSignal::Change(change)).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    let _ = callback_tx.blocking_send(WatchSignal::Error(e.to_string()));
                }
            }
        })?;

        let mut watched = Vec::new();
        for root in &roots {
            match watcher.watch(root, RecursiveMode::Recursive) {
                Ok(()) => {
                    tracing::debug!(root = %root.display(), "watching");
                    watched.push(root.clone());
                }
                Err(e) => {
                    tracing::warn!(root = %root.display(), error = %e, "cannot watch root");
                }
            }
        }

        // Fresh channel: both signals fit without waiting
        let _ = tx.try_send(WatchSignal::Ready);
        if watched.is_empty() {
            let _ = tx.try_send(WatchSignal::Error(
                "none of the watch roots could be registered".to_string(),
            ));
        }
        ready.store(true, Ordering::Release);

        Ok((
            Self {
                _watcher: watcher,
                roots: watched,
            },
            ReceiverStream::new(rx),
        ))
    }

    /// Roots that were registered successfully.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

/// Map a `notify` event kind onto a [`ChangeKind`]. Access and other
/// bookkeeping events carry no content change.
pub(crate) fn classify(kind: &EventKind, path: &Path) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(CreateKind::Folder) => Some(ChangeKind::DirAdded),
        EventKind::Create(_) => Some(if path.is_dir() {
            ChangeKind::DirAdded
        } else {
            ChangeKind::Added
        }),
        // Renames report both ends; existence tells them apart
        EventKind::Modify(ModifyKind::Name(_)) => Some(if path.is_dir() {
            ChangeKind::DirAdded
        } else if path.exists() {
            ChangeKind::Added
        } else {
            ChangeKind::Removed
        }),
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        EventKind::Remove(RemoveKind::Folder) => Some(ChangeKind::DirRemoved),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        EventKind::Access(_) | EventKind::Other | EventKind::Any => None,
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
