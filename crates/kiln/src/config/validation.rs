use crate::config::KilnConfig;
use crate::error::{ConfigError, Result};
use std::path::Path;

/// Replace `${srcdir}` and `${outdir}` placeholders.
pub fn substitute(template: &str, src_dir: &Path, out_dir: &Path) -> String {
    template
        .replace("${srcdir}", &src_dir.to_string_lossy())
        .replace("${outdir}", &out_dir.to_string_lossy())
}

impl KilnConfig {
    /// Validate configuration for logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.entry.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "entry".to_string(),
                hint: "Provide an entry point, e.g. \"src/index.ts\"".to_string(),
            }
            .into());
        }

        if self.debounce.rebuild_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "debounce.rebuildMs".to_string(),
                value: "0".to_string(),
                hint: "The quiet window must be at least 1ms".to_string(),
            }
            .into());
        }

        if self.debounce.reload_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "debounce.reloadMs".to_string(),
                value: "0".to_string(),
                hint: "The quiet window must be at least 1ms".to_string(),
            }
            .into());
        }

        if let Some(run) = &self.run {
            if run.is_empty() || run[0].trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "run".to_string(),
                    value: "[]".to_string(),
                    hint: "Give the program and its arguments, e.g. [\"node\", \"${outdir}/index.js\"]"
                        .to_string(),
                }
                .into());
            }
            if self.platform == crate::config::Platform::Browser {
                tracing::warn!("`run` is set but platform is \"browser\"; the output may not run headless");
            }
        }

        if self.server.default_document.contains('/') || self.server.default_document.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "server.defaultDocument".to_string(),
                value: self.server.default_document.clone(),
                hint: "Use a plain file name such as index.html".to_string(),
            }
            .into());
        }

        if self.bundler.program.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "bundler.program".to_string(),
                hint: "Name an esbuild-compatible executable".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
