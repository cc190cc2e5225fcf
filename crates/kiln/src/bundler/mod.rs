//! The bundler collaborator.
//!
//! Kiln never bundles anything itself. It hands [`BundleOptions`] to a
//! [`Bundler`] and gets a [`BuildResult`] back. The shipped implementation,
//! [`CommandBundler`], drives an esbuild-compatible executable; tests plug in
//! their own implementations.

mod command;

pub use command::{CommandBundler, CommandContext};

use crate::config::{KilnConfig, Platform};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Severity of a bundler diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One message reported by the bundler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Error => write!(f, "error: {}", self.message),
            Severity::Warning => write!(f, "warning: {}", self.message),
        }
    }
}

/// Outcome of one build invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    /// Whether the bundler produced output
    pub ok: bool,
    /// Errors and warnings, in the order the bundler reported them
    pub diagnostics: Vec<Diagnostic>,
    /// Wall-clock time of the invocation
    pub duration_ms: u64,
}

impl BuildResult {
    pub fn success(diagnostics: Vec<Diagnostic>, duration_ms: u64) -> Self {
        Self {
            ok: true,
            diagnostics,
            duration_ms,
        }
    }

    pub fn failure(diagnostics: Vec<Diagnostic>, duration_ms: u64) -> Self {
        Self {
            ok: false,
            diagnostics,
            duration_ms,
        }
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    /// Convert a failed result into a [`crate::error::BuildError`].
    pub fn into_result(self) -> Result<Self, crate::error::BuildError> {
        if self.ok {
            Ok(self)
        } else {
            Err(crate::error::BuildError::Failed {
                diagnostics: self.diagnostics,
            })
        }
    }
}

/// Everything the bundler needs to produce the build target.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleOptions {
    pub entry: PathBuf,
    pub out_dir: PathBuf,
    pub minify: bool,
    pub sourcemap: bool,
    pub platform: Platform,
    pub target: String,
    /// Modules left out of the bundle
    pub external: Vec<String>,
    /// Manifest `override` bag, merged over the generated options
    pub overrides: serde_json::Map<String, serde_json::Value>,
    /// Directory the bundler runs in
    pub cwd: PathBuf,
}

impl BundleOptions {
    pub fn from_config(config: &KilnConfig) -> Self {
        Self {
            entry: config.entry_path(),
            out_dir: config.out_path(),
            minify: config.minify,
            sourcemap: config.sourcemap,
            platform: config.platform,
            target: config.target.clone(),
            external: config.external.clone(),
            overrides: config.override_options.clone(),
            cwd: config.project_root(),
        }
    }
}

/// A bundling engine.
///
/// `rebuild` reuses a context established by `prepare` and must be observably
/// equivalent to `build` with the same options.
#[async_trait]
pub trait Bundler: Send + Sync + 'static {
    /// Reusable state for fast rebuilds.
    type Context: Send + Sync + 'static;

    /// One-shot build.
    async fn build(&self, options: &BundleOptions) -> BuildResult;

    /// Establish a context for later rebuilds.
    async fn prepare(&self, options: &BundleOptions) -> crate::error::Result<Self::Context>;

    /// Build again from an established context.
    async fn rebuild(&self, context: &Self::Context) -> BuildResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_config() {
        let config = KilnConfig {
            cwd: Some(PathBuf::from("/p")),
            external: vec!["react".to_string()],
            minify: true,
            ..KilnConfig::default()
        };
        let options = BundleOptions::from_config(&config);

        assert_eq!(options.entry, PathBuf::from("/p/src/index.ts"));
        assert_eq!(options.out_dir, PathBuf::from("/p/dist"));
        assert_eq!(options.external, vec!["react"]);
        assert!(options.minify);
        assert_eq!(options.cwd, PathBuf::from("/p"));
    }

    #[test]
    fn test_build_result_into_result() {
        let ok = BuildResult::success(vec![Diagnostic::new(Severity::Warning, "w")], 3);
        assert_eq!(ok.warnings().count(), 1);
        assert!(ok.into_result().is_ok());

        let failed = BuildResult::failure(vec![Diagnostic::error("boom")], 3);
        let err = failed.into_result().unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_diagnostic_display() {
        assert_eq!(Diagnostic::error("x").to_string(), "error: x");
        assert_eq!(
            Diagnostic::new(Severity::Warning, "y").to_string(),
            "warning: y"
        );
    }
}
