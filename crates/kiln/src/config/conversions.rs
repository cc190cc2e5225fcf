use crate::cli::{BuildArgs, DevArgs, RunArgs};
use crate::config::types::*;

// Conversion implementations: CLI args -> config overrides

impl From<crate::cli::Platform> for Platform {
    fn from(p: crate::cli::Platform) -> Self {
        match p {
            crate::cli::Platform::Browser => Platform::Browser,
            crate::cli::Platform::Node => Platform::Node,
            crate::cli::Platform::Neutral => Platform::Neutral,
        }
    }
}

impl From<&BuildArgs> for ConfigOverrides {
    fn from(args: &BuildArgs) -> Self {
        Self {
            entry: args.entry.clone(),
            out_dir: args.out_dir.clone(),
            // Flags only ever switch these on
            minify: args.minify.then_some(true),
            sourcemap: args.sourcemap.then_some(true),
            platform: args.platform.map(Into::into),
            external: (!args.external.is_empty()).then(|| args.external.clone()),
            cwd: args.cwd.clone(),
            ..Self::default()
        }
    }
}

impl From<&DevArgs> for ConfigOverrides {
    fn from(args: &DevArgs) -> Self {
        let server = ServerOverrides {
            host: args.host.clone(),
            port: args.port,
            live_reload: args.no_reload.then_some(false),
        };
        Self {
            entry: args.entry.clone(),
            out_dir: args.out_dir.clone(),
            server: Some(server),
            cwd: args.cwd.clone(),
            ..Self::default()
        }
    }
}

impl From<&RunArgs> for ConfigOverrides {
    fn from(args: &RunArgs) -> Self {
        Self {
            entry: args.entry.clone(),
            out_dir: args.out_dir.clone(),
            run: (!args.command.is_empty()).then(|| args.command.clone()),
            cwd: args.cwd.clone(),
            ..Self::default()
        }
    }
}
