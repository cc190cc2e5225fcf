//! Kiln - development-time build orchestrator.
//!
//! Kiln sits around an esbuild-compatible bundler and keeps its output fresh
//! while you edit: it watches the sources, coalesces bursts of changes into
//! one rebuild, then either tells connected browsers to reload (or just swap
//! stylesheets) or restarts a headless process.
//!
//! # Architecture
//!
//! - [`dev`] - The session: watcher, debouncer, build invoker, reload hub,
//!   static server and process supervisor, driven by one event loop
//! - [`bundler`] - The `Bundler` seam and the command-line bundler adapter
//! - [`config`] - Layered configuration (`kiln.config.json`, `KILN_*`, CLI)
//! - [`error`] - Error types with actionable messages
//! - [`logger`] - Structured logging with tracing
//! - [`ui`] - Terminal status lines
//! - `cli` / `commands` - The `kiln` binary's argument parsing and commands
//!
//! # Example
//!
//! ```rust,no_run
//! use kiln::bundler::CommandBundler;
//! use kiln::config::KilnConfig;
//! use kiln::dev::{DevConfig, DevSession};
//!
//! # async fn run() -> kiln::Result<()> {
//! let config = DevConfig::serve(KilnConfig::default())?;
//! let session = DevSession::start(config, CommandBundler::default()).await?;
//! session.run(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await
//! # }
//! ```

// Public modules
pub mod bundler;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

// Re-export commonly used types
pub use error::{BuildError, ConfigError, KilnError, Result, ResultExt};
