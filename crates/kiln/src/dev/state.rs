//! Session status shared with the HTTP server.
//!
//! The session task is the only writer; request handlers read a snapshot for
//! `GET /__kiln/status`.

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Build status tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum BuildStatus {
    /// No build has been performed yet
    NotStarted,
    /// Build is currently in progress
    InProgress,
    /// Build completed successfully
    #[serde(rename_all = "camelCase")]
    Success { duration_ms: u64 },
    /// Build failed with error
    Failed { error: String },
}

impl BuildStatus {
    /// Check if build is currently running.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, BuildStatus::InProgress)
    }

    /// Check if last build succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Success { .. })
    }

    /// Get error message if failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            BuildStatus::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// Snapshot served as JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub build: BuildStatus,
    pub builds: usize,
    pub clients: usize,
}

/// Session status readable from any task.
#[derive(Debug)]
pub struct StatusBoard {
    status: RwLock<BuildStatus>,
    builds: AtomicUsize,
    clients: AtomicUsize,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self {
            status: RwLock::new(BuildStatus::NotStarted),
            builds: AtomicUsize::new(0),
            clients: AtomicUsize::new(0),
        }
    }

    /// Update build status to in-progress.
    pub fn start_build(&self) {
        *self.status.write() = BuildStatus::InProgress;
    }

    /// Update build status to success.
    pub fn complete_build(&self, duration_ms: u64) {
        self.builds.fetch_add(1, Ordering::Relaxed);
        *self.status.write() = BuildStatus::Success { duration_ms };
    }

    /// Update build status to failed.
    pub fn fail_build(&self, error: String) {
        self.builds.fetch_add(1, Ordering::Relaxed);
        *self.status.write() = BuildStatus::Failed { error };
    }

    pub fn set_clients(&self, count: usize) {
        self.clients.store(count, Ordering::Relaxed);
    }

    /// Get current build status.
    pub fn status(&self) -> BuildStatus {
        self.status.read().clone()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            build: self.status(),
            builds: self.builds.load(Ordering::Relaxed),
            clients: self.clients.load(Ordering::Relaxed),
        }
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared status handle.
pub type SharedStatus = Arc<StatusBoard>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_lifecycle() {
        let board = StatusBoard::new();
        assert_eq!(board.status(), BuildStatus::NotStarted);

        board.start_build();
        assert!(board.status().is_in_progress());

        board.complete_build(150);
        assert!(board.status().is_success());

        board.fail_build("Test error".to_string());
        assert_eq!(board.status().error(), Some("Test error"));
        assert_eq!(board.snapshot().builds, 2);
    }

    #[test]
    fn test_snapshot_json() {
        let board = StatusBoard::new();
        board.complete_build(42);
        board.set_clients(3);

        let json = serde_json::to_value(board.snapshot()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "build": { "state": "success", "durationMs": 42 },
                "builds": 1,
                "clients": 3
            })
        );
    }
}
