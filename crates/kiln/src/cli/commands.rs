use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::cli::enums::*;
use crate::cli::validation::parse_host;

/// Available Kiln subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build once
    ///
    /// Runs preBuild hooks, invokes the bundler, then runs postBuild hooks.
    /// Exits non-zero when the build reports errors.
    Build(BuildArgs),

    /// Start the development server with live reload
    ///
    /// Watches the sources, rebuilds after a quiet period, serves the output
    /// directory and tells connected browsers to reload.
    Dev(DevArgs),

    /// Rebuild and restart a headless process
    ///
    /// Watches the sources, rebuilds after a quiet period and restarts the
    /// given command after every successful rebuild.
    Run(RunArgs),
}

/// Arguments for the build command
#[derive(Args, Debug, Default)]
pub struct BuildArgs {
    /// Entry point to bundle (defaults to the manifest's `entry`)
    #[arg(value_name = "ENTRY")]
    pub entry: Option<String>,

    /// Output directory for bundled files
    #[arg(short = 'd', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Enable minification of output
    #[arg(short = 'm', long)]
    pub minify: bool,

    /// Emit external source maps
    #[arg(long)]
    pub sourcemap: bool,

    /// Target platform environment
    #[arg(long, value_enum)]
    pub platform: Option<Platform>,

    /// External packages to exclude from the bundle
    ///
    /// Examples:
    ///   --external react --external react-dom
    ///   --external react,react-dom
    #[arg(short, long, value_name = "PACKAGE", value_delimiter = ',')]
    pub external: Vec<String>,

    /// Project root; relative paths resolve against it
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,
}

/// Arguments for the dev command (development server)
#[derive(Args, Debug, Default)]
pub struct DevArgs {
    /// Entry point to bundle (defaults to the manifest's `entry`)
    #[arg(value_name = "ENTRY")]
    pub entry: Option<String>,

    /// Port for the development server
    ///
    /// The next ten ports are tried if this one is busy. 0 picks any free
    /// port.
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Interface to listen on
    #[arg(long, value_parser = parse_host, value_name = "HOST")]
    pub host: Option<String>,

    /// Serve the output without pushing reloads to browsers
    #[arg(long)]
    pub no_reload: bool,

    /// Output directory to build into and serve
    #[arg(short = 'd', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Project root; relative paths resolve against it
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,
}

/// Arguments for the run command (process supervision)
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Entry point to bundle (defaults to the manifest's `entry`)
    #[arg(value_name = "ENTRY")]
    pub entry: Option<String>,

    /// Output directory to build into
    #[arg(short = 'd', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Project root; relative paths resolve against it
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Command to supervise, after `--`
    ///
    /// `${srcdir}` and `${outdir}` are substituted. Defaults to the manifest's
    /// `run`, then `node <outDir>/<entry stem>.js`.
    ///
    /// Example: kiln run src/server.ts -- node --enable-source-maps dist/server.js
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}
