//! Terminal UI utilities: status lines and formatted output.
//!
//! Kiln prints a handful of human-facing lines (server address, build results,
//! process restarts) to stderr. Everything else goes through `tracing`.
//!
//! ```no_run
//! use kiln::ui;
//! use std::time::Duration;
//!
//! ui::init_colors(false);
//! ui::success(&format!("Rebuilt in {}", ui::format_duration(Duration::from_millis(42))));
//! ui::warning("Watcher failed; press `rs` + Enter to rebuild manually");
//! ```

mod format;
mod messages;

use owo_colors::{OwoColorize, Style};
use std::sync::atomic::{AtomicBool, Ordering};

pub use format::{format_duration, print_diagnostics};
pub use messages::{error, info, success, warning};

static COLORS: AtomicBool = AtomicBool::new(true);

/// Decide once whether status lines are colored.
///
/// `no_color` (the `--no-color` flag) wins, then `NO_COLOR`/`FORCE_COLOR` and
/// terminal detection via [`crate::logger::should_use_colors`].
pub fn init_colors(no_color: bool) {
    let enabled = !no_color && crate::logger::should_use_colors();
    COLORS.store(enabled, Ordering::Relaxed);
}

pub fn colors_enabled() -> bool {
    COLORS.load(Ordering::Relaxed)
}

/// Apply `style` when colors are enabled.
pub(crate) fn paint(text: &str, style: Style) -> String {
    if colors_enabled() {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}
