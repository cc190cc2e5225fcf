//! Configuration for Kiln with multi-source loading.
//!
//! Merges settings from CLI args, environment variables and `kiln.config.json`.
//! Priority: CLI > Environment > File > Defaults

mod conversions;
mod defaults;
mod loading;
mod types;
mod validation;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use defaults::*;
pub use loading::CONFIG_FILE_NAME;
pub use types::*;
pub use validation::substitute;

/// Kiln configuration - loaded from kiln.config.json, `KILN_*` variables and CLI args.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KilnConfig {
    /// Entry point to bundle (e.g., "src/index.ts")
    #[serde(default = "default_entry")]
    pub entry: String,

    /// Source directory, substituted for `${srcdir}` in hooks
    #[serde(default = "default_src_dir")]
    pub src_dir: PathBuf,

    /// Output directory, substituted for `${outdir}` and served by the dev server
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,

    /// Enable minification
    #[serde(default)]
    pub minify: bool,

    /// Emit external source maps
    #[serde(default = "default_sourcemap")]
    pub sourcemap: bool,

    /// Target platform
    #[serde(default = "default_platform")]
    pub platform: Platform,

    /// Language target passed to the bundler (e.g., "es2020", "node18")
    #[serde(default = "default_target")]
    pub target: String,

    /// Modules excluded from the bundle
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external: Vec<String>,

    /// Extra bundler options merged over the generated ones
    #[serde(default, rename = "override", skip_serializing_if = "serde_json::Map::is_empty")]
    pub override_options: serde_json::Map<String, serde_json::Value>,

    /// Commands run once before the initial build
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_build: Vec<String>,

    /// Commands run after every successful build
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_build: Vec<String>,

    /// Command line of the supervised process (`kiln run`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<Vec<String>>,

    /// Bundler executable settings
    #[serde(default)]
    pub bundler: BundlerConfig,

    /// Dev server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// File watching settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Quiet windows per concern
    #[serde(default)]
    pub debounce: DebounceConfig,

    /// Working directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

impl Default for KilnConfig {
    fn default() -> Self {
        Self {
            entry: default_entry(),
            src_dir: default_src_dir(),
            out_dir: default_out_dir(),
            minify: false,
            sourcemap: default_sourcemap(),
            platform: default_platform(),
            target: default_target(),
            external: vec![],
            override_options: serde_json::Map::new(),
            pre_build: vec![],
            post_build: vec![],
            run: None,
            bundler: BundlerConfig::default(),
            server: ServerConfig::default(),
            watch: WatchConfig::default(),
            debounce: DebounceConfig::default(),
            cwd: None,
        }
    }
}

impl KilnConfig {
    /// Project root: the configured `cwd`, or the process working directory.
    pub fn project_root(&self) -> PathBuf {
        match &self.cwd {
            Some(cwd) => cwd.clone(),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Resolve a path against the project root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root().join(path)
        }
    }

    /// Absolute entry point.
    pub fn entry_path(&self) -> PathBuf {
        self.resolve(Path::new(&self.entry))
    }

    /// Absolute source directory.
    pub fn src_path(&self) -> PathBuf {
        self.resolve(&self.src_dir)
    }

    /// Absolute output directory.
    pub fn out_path(&self) -> PathBuf {
        self.resolve(&self.out_dir)
    }

    /// Roots handed to the change detector; defaults to the source directory.
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        if self.watch.paths.is_empty() {
            vec![self.src_path()]
        } else {
            self.watch.paths.iter().map(|p| self.resolve(p)).collect()
        }
    }

    /// Replace `${srcdir}` and `${outdir}` in a manifest string.
    pub fn substitute(&self, template: &str) -> String {
        substitute(template, &self.src_path(), &self.out_path())
    }

    /// Generate example kiln.config.json content.
    pub fn example_config() -> String {
        let mut config = Self {
            external: vec!["fsevents".to_string()],
            pre_build: vec!["mkdir -p ${outdir}".to_string()],
            post_build: vec!["cp ${srcdir}/index.html ${outdir}/index.html".to_string()],
            ..Self::default()
        };
        config
            .override_options
            .insert("jsx".to_string(), serde_json::Value::from("automatic"));

        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "{}".to_string())
    }
}
