//! Command-line interface definition for Kiln.
//!
//! Built with clap v4's derive macros.
//!
//! # Command Structure
//!
//! - `kiln build` - One-shot build with hooks
//! - `kiln dev` - Watch, rebuild, serve the output with live reload
//! - `kiln run` - Watch, rebuild, restart a headless process

mod commands;
pub mod enums;
mod tests;
mod validation;

use clap::Parser;
use std::path::PathBuf;

pub use commands::{BuildArgs, Command, DevArgs, RunArgs};
pub use enums::*;
pub use validation::parse_host;

/// Kiln - development build orchestrator
#[derive(Parser, Debug)]
#[command(
    name = "kiln",
    version,
    about = "Development build orchestrator around an esbuild-compatible bundler",
    long_about = "Kiln watches your sources, rebuilds through a bundler after a quiet period,\n\
                  and keeps the result fresh: browsers get live reload from the built-in\n\
                  static server, headless targets get restarted."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    ///
    /// Shows every watch event, debounce firing and served request.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to the manifest (defaults to kiln.config.json in the project root)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
