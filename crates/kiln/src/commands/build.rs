//! Build command implementation.
//!
//! `kiln build` runs the hooks and the bundler once and exits non-zero when
//! the bundler reports errors.

use crate::bundler::{BuildResult, Bundler, CommandBundler};
use crate::cli::BuildArgs;
use crate::config::{ConfigOverrides, KilnConfig};
use crate::dev::BuildInvoker;
use crate::error::Result;
use crate::ui;
use std::path::Path;
use std::time::Instant;

/// Execute the build command.
///
/// # Build Process
///
/// 1. Load and validate configuration (CLI > Env > File > Defaults)
/// 2. Check the entry point
/// 3. Run `preBuild` hooks
/// 4. Invoke the bundler
/// 5. Run `postBuild` hooks on success
///
/// # Errors
///
/// Returns errors for invalid configuration, a missing entry point, failing
/// hooks and builds that report errors
pub async fn execute(args: BuildArgs, config_path: Option<&Path>) -> Result<()> {
    let start_time = Instant::now();

    ui::info("Loading configuration...");
    let config = KilnConfig::load(&ConfigOverrides::from(&args), config_path)?;
    config.validate()?;

    let invoker = BuildInvoker::from_config(
        CommandBundler::new(config.bundler.program.clone()),
        &config,
    );
    build(&invoker).await?;

    ui::success(&format!(
        "Build completed in {}",
        ui::format_duration(start_time.elapsed())
    ));
    ui::info(&format!("Output: {}", config.out_path().display()));

    Ok(())
}

/// Run one build with hooks through `invoker`.
///
/// Warnings are printed here; errors come back inside
/// [`BuildError::Failed`](crate::error::BuildError::Failed).
pub async fn build<B: Bundler>(invoker: &BuildInvoker<B>) -> Result<BuildResult> {
    invoker.check_entry()?;
    invoker.run_pre_build().await?;

    ui::info(&format!("Building: {}", invoker.options().entry.display()));
    let result = invoker.build().await;

    if result.ok {
        ui::print_diagnostics(&result.diagnostics);
    }
    Ok(result.into_result()?)
}
