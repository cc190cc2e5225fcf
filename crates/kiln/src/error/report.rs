//! Miette diagnostic conversion for Kiln errors.

use crate::error::{BuildError, KilnError};
use miette::Report;

/// Convert KilnError to miette Report
pub fn kiln_error_to_miette(err: KilnError) -> Report {
    match err {
        KilnError::Build(e) => build_error_to_miette(e),
        KilnError::Config(e) => miette::miette!("Configuration error: {}", e),
        _ => miette::miette!("{}", err),
    }
}

/// Convert BuildError to miette Report
pub fn build_error_to_miette(err: BuildError) -> Report {
    match err {
        BuildError::Failed { diagnostics } => {
            let mut lines = diagnostics.iter().map(|d| d.to_string());
            let headline = lines.next().unwrap_or_else(|| "Build failed".to_string());
            let rest: Vec<String> = lines.collect();
            if rest.is_empty() {
                miette::miette!("{}", headline)
            } else {
                miette::miette!("{}\n\n{}", headline, rest.join("\n"))
            }
        }
        BuildError::EntryNotFound(path) => miette::miette!(
            help = "Check the 'entry' field in kiln.config.json or the ENTRY argument",
            "Entry point not found: {}",
            path.display()
        ),
    }
}
