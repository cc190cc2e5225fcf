//! Error handling for Kiln.
//!
//! A hierarchical error type system built on `thiserror`. Each variant is meant
//! to be actionable: it says what failed and, where it can, how to fix it.
//!
//! # Architecture
//!
//! - **Top-level errors** (`KilnError`) represent broad categories of failures
//! - **Domain-specific errors** (`ConfigError`, `BuildError`) carry detail
//! - **Error conversion** is automatic via `#[from]` attributes
//! - **Context helpers** ([`ResultExt`]) attach paths and hints
//!
//! Only startup failures reach the top of the binary. Failures inside a running
//! dev session (a broken build, a dropped client, a crashed child process) are
//! logged by the session and never surface as a `KilnError`.
//!
//! # Example
//!
//! ```rust,no_run
//! use kiln::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_manifest(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .with_path(path)
//!         .with_hint("Create a kiln.config.json file or pass --config <path>")
//! }
//! ```

mod report;

pub use report::{build_error_to_miette, kiln_error_to_miette};

use crate::bundler::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level Kiln error type.
#[derive(Debug, Error)]
pub enum KilnError {
    /// Configuration-related errors (file not found, invalid values, etc.)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Build errors (missing entry point, bundler failures)
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Development server errors
    #[error("Server error: {0}")]
    Server(String),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// Supervised process errors
    #[error("Process error: {0}")]
    Process(String),

    /// A preBuild/postBuild hook command failed
    #[error("Hook `{command}` failed: {reason}")]
    Hook {
        /// The command line after placeholder substitution
        command: String,
        /// Exit status or spawn error
        reason: String,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file doesn't exist at the expected location
    #[error("Config file not found: {}\n\nHint: Create a kiln.config.json file or specify --config <path>", .0.display())]
    NotFound(PathBuf),

    /// Missing required configuration field
    #[error("Missing required field: {field}\n\nHint: {hint}")]
    MissingField {
        /// Name of the missing field
        field: String,
        /// Helpful hint for providing the field
        hint: String,
    },

    /// Invalid value for a configuration option
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },

    /// I/O error while reading config
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

/// Build errors.
///
/// Only the one-shot `kiln build` command and the initial build turn a failed
/// build into an error; rebuilds inside a dev session just log diagnostics.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Entry point file doesn't exist
    #[error("Entry point not found: {}\n\nHint: Check the 'entry' field in kiln.config.json or the ENTRY argument", .0.display())]
    EntryNotFound(PathBuf),

    /// The bundler reported diagnostics
    #[error("Build failed with {} diagnostic(s):\n{}", .diagnostics.len(), format_diagnostics(.diagnostics))]
    Failed {
        /// Diagnostics in the order the bundler reported them
        diagnostics: Vec<Diagnostic>,
    },
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| format!("  {d}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result type alias using `KilnError` as the default error type.
pub type Result<T, E = KilnError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Turn a `NotFound` I/O error into [`KilnError::FileNotFound`] for `path`.
    ///
    /// ```rust,no_run
    /// # use std::path::Path;
    /// # use kiln::error::{Result, ResultExt};
    /// # fn run() -> Result<()> {
    /// let path = Path::new("kiln.config.json");
    /// std::fs::read_to_string(path).with_path(path)?;
    /// # Ok(())
    /// # }
    /// ```
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Append a hint to the error message.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error message.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<KilnError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| match e.into() {
            KilnError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                KilnError::FileNotFound(path.as_ref().to_path_buf())
            }
            other => other,
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: KilnError = e.into();
            KilnError::Custom(format!("{}\n\nHint: {}", err, hint))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: KilnError = e.into();
            KilnError::Custom(format!("{}: {}", msg, err))
        })
    }
}
