use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::defaults::*;

/// Target platform environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Browser,
    Node,
    Neutral,
}

impl Platform {
    /// Flag value understood by the bundler.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Browser => "browser",
            Platform::Node => "node",
            Platform::Neutral => "neutral",
        }
    }
}

/// Bundler executable settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BundlerConfig {
    /// Program name or path of an esbuild-compatible CLI
    #[serde(default = "default_bundler_program")]
    pub program: String,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            program: default_bundler_program(),
        }
    }
}

/// Dev server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Push reload messages to connected browsers
    #[serde(default = "default_live_reload")]
    pub live_reload: bool,

    /// Document served for `/`
    #[serde(default = "default_document")]
    pub default_document: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            live_reload: default_live_reload(),
            default_document: default_document(),
        }
    }
}

/// File watching settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WatchConfig {
    /// Roots to watch; empty means the source directory
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<PathBuf>,

    /// Extra ignore patterns on top of the defaults
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<String>,
}

/// Quiet windows in milliseconds, one per concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DebounceConfig {
    #[serde(default = "default_rebuild_ms")]
    pub rebuild_ms: u64,

    #[serde(default = "default_reload_ms")]
    pub reload_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            rebuild_ms: default_rebuild_ms(),
            reload_ms: default_reload_ms(),
        }
    }
}

/// Values coming from the command line. `None` leaves lower layers untouched.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub minify: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sourcemap: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub external: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerOverrides>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

/// Server values from the command line.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_reload: Option<bool>,
}
