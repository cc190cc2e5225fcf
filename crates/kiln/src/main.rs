//! Kiln CLI entry point: argument parsing, logging initialization and command
//! dispatch.

use clap::Parser;
use kiln::{cli, commands, error, logger, ui};
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = cli::Cli::parse();

    // Initialize logging and colors based on global flags
    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    let config_path = args.config.as_deref();

    // Execute the appropriate command
    let result = match args.command {
        cli::Command::Build(build_args) => commands::build_execute(build_args, config_path).await,
        cli::Command::Dev(dev_args) => commands::dev_execute(dev_args, config_path).await,
        cli::Command::Run(run_args) => commands::run_execute(run_args, config_path).await,
    };

    // Convert errors to miette diagnostics for error reporting
    result.map_err(error::kiln_error_to_miette)
}
