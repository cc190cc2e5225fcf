//! Command implementations for the Kiln CLI.
//!
//! - [`build`] - One-shot build with hooks
//! - [`dev`] - Development server with live reload
//! - [`run`] - Process supervision
//!
//! Each command provides an `execute` function taking the parsed arguments and
//! the global `--config` path.

pub mod build;
pub mod dev;
pub mod run;
pub(crate) mod utils;

// Re-export execute functions for convenience
pub use build::execute as build_execute;
pub use dev::execute as dev_execute;
pub use run::execute as run_execute;
