use std::path::PathBuf;

use crate::config::types::Platform;

pub fn default_entry() -> String {
    "src/index.ts".to_string()
}

pub fn default_src_dir() -> PathBuf {
    PathBuf::from("src")
}

pub fn default_out_dir() -> PathBuf {
    PathBuf::from("dist")
}

pub fn default_sourcemap() -> bool {
    true
}

pub fn default_platform() -> Platform {
    Platform::Browser
}

pub fn default_target() -> String {
    "es2020".to_string()
}

pub fn default_bundler_program() -> String {
    "esbuild".to_string()
}

pub fn default_host() -> String {
    "127.0.0.1".to_string()
}

pub fn default_port() -> u16 {
    3000
}

pub fn default_live_reload() -> bool {
    true
}

pub fn default_document() -> String {
    "index.html".to_string()
}

pub fn default_rebuild_ms() -> u64 {
    1000
}

pub fn default_reload_ms() -> u64 {
    2000
}

/// Ignore patterns every watch session starts with.
///
/// The output directory is added at runtime so a build never retriggers itself.
pub fn default_watch_ignore() -> Vec<String> {
    vec![
        "node_modules".to_string(),
        ".git".to_string(),
        "*.map".to_string(),
        ".DS_Store".to_string(),
    ]
}
