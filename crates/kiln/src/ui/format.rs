//! Formatting utilities for durations and build diagnostics.

use crate::bundler::{Diagnostic, Severity};
use super::paint;
use owo_colors::Style;
use std::time::Duration;

/// Format duration in human-readable format.
///
/// ```
/// use std::time::Duration;
/// use kiln::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Print build diagnostics to stderr, in the order the bundler reported them.
pub fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        match diagnostic.severity {
            Severity::Error => eprintln!(
                "  {} {}",
                paint("error", Style::new().red().bold()),
                diagnostic.message
            ),
            Severity::Warning => eprintln!(
                "  {} {}",
                paint("warning", Style::new().yellow().bold()),
                diagnostic.message
            ),
        }
    }
}
