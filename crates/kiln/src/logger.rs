//! Logging infrastructure for Kiln.
//!
//! Structured logging on the `tracing` ecosystem. The dev session logs every
//! stage (watch, debounce, build, broadcast, restart) through `tracing`, while
//! the short human-facing status lines go through [`crate::ui`].
//!
//! # Verbosity Levels
//!
//! 1. `--verbose`: DEBUG for kiln (includes the per-request access log)
//! 2. `--quiet`: ERROR only
//! 3. `RUST_LOG`: custom filter
//! 4. Default: INFO for kiln
//!
//! ```rust,no_run
//! use kiln::logger::init_logger;
//! use tracing::{debug, info};
//!
//! init_logger(false, false, false);
//!
//! info!("Watching src");
//! debug!(path = "src/index.ts", "change observed");
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERBOSE_FILTER: &str = "kiln=debug,tower_http=debug";
const QUIET_FILTER: &str = "kiln=error";
const DEFAULT_FILTER: &str = "kiln=info";

/// Initialize the tracing subscriber with the specified options.
///
/// Call once at the start of the program, before any logging occurs.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(filter_for(verbose, quiet), no_color);
}

/// Initialize logger with custom environment filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && should_use_colors())
        .compact();

    // try_init: tests and embedders may already have installed a subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Check if colored output should be enabled.
///
/// `NO_COLOR` disables colors, `FORCE_COLOR` forces them, otherwise the
/// `console` crate decides from terminal capabilities.
pub fn should_use_colors() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    console::Term::stderr().features().colors_supported()
}
