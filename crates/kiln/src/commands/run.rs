//! Process supervision command implementation.

use crate::cli::RunArgs;
use crate::commands::utils;
use crate::config::{ConfigOverrides, KilnConfig};
use crate::dev::{DevConfig, DevTarget};
use crate::error::Result;
use crate::ui;
use std::path::Path;

/// Execute the run command.
///
/// Like `kiln dev` without a server: the supervised command is started after
/// the initial build and restarted after every successful rebuild.
pub async fn execute(args: RunArgs, config_path: Option<&Path>) -> Result<()> {
    let base = KilnConfig::load(&ConfigOverrides::from(&args), config_path)?;
    let config = DevConfig::supervise(base)?;

    if let DevTarget::Supervise { command } = &config.target {
        ui::info(&format!("Supervising: {}", command.display()));
    }

    utils::run_session(config).await
}
