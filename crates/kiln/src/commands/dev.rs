//! Development server command implementation.

use crate::cli::DevArgs;
use crate::commands::utils;
use crate::config::{ConfigOverrides, KilnConfig};
use crate::dev::DevConfig;
use crate::error::Result;
use crate::ui;
use std::path::Path;

/// Execute the dev command.
///
/// Loads the configuration, picks a free port and runs a serving session until
/// Ctrl+C.
///
/// # Errors
///
/// Startup failures only: invalid configuration, no free port, a failing
/// `preBuild` hook, a watcher that cannot be created. Build failures inside the
/// session are reported and the session keeps running.
pub async fn execute(args: DevArgs, config_path: Option<&Path>) -> Result<()> {
    ui::info("Starting development server...");

    let base = KilnConfig::load(&ConfigOverrides::from(&args), config_path)?;
    let config = DevConfig::serve(base)?;

    if !config.base.server.live_reload {
        ui::info("Live reload disabled");
    }

    utils::run_session(config).await
}
