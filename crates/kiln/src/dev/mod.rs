//! Development session.
//!
//! Keeps a build target fresh while sources change:
//! - Change detection over the watch roots with ignore rules
//! - Per-concern debouncing of rebuilds and client notifications
//! - Rebuilds through a reusable bundler context
//! - Live reload over WebSocket with a CSS-only fast path
//! - Static serving of the output directory
//! - Restart of a supervised process after each successful rebuild

pub mod builder;
pub mod config;
pub mod debounce;
pub mod hub;
pub mod server;
pub mod session;
pub mod state;
pub mod supervisor;
pub mod watcher;

// Re-exports
pub use builder::{run_hook, run_hooks, BuildInvoker, Hooks};
pub use config::{default_run_command, DevConfig, DevTarget};
pub use debounce::{Concern, Debouncer};
pub use hub::{classify_batch, ClientEvent, ClientId, ClientRegistrar, ReloadHub, ReloadMessage};
pub use server::{serve_path, DevServer, ServerState};
pub use session::{DevSession, SessionCommand, SessionHandle};
pub use state::{BuildStatus, SharedStatus, StatusBoard, StatusSnapshot};
pub use supervisor::{ProcessCommand, ProcessEvent, ProcessId, ProcessState, ProcessSupervisor};
pub use watcher::{ChangeDetector, ChangeEvent, ChangeKind, IgnoreRules, WatchSignal};
