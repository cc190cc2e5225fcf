use crate::config::{ConfigOverrides, KilnConfig};
use crate::error::{ConfigError, Result};
use figment::{
    providers::{Env, Format as _, Json, Serialized},
    Figment,
};
use std::path::{Path, PathBuf};

/// Manifest file looked up in the project root.
pub const CONFIG_FILE_NAME: &str = "kiln.config.json";

impl KilnConfig {
    /// Load configuration from multiple sources.
    /// Priority: CLI args > environment variables > config file > defaults
    ///
    /// `config_path` must exist when given; otherwise `kiln.config.json` in the
    /// project root is used if present.
    pub fn load(overrides: &ConfigOverrides, config_path: Option<&Path>) -> Result<Self> {
        let root = overrides
            .cwd
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        let config_file = match config_path {
            Some(path) => {
                let path = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    root.join(path)
                };
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path).into());
                }
                Some(path)
            }
            None => {
                let default_path = root.join(CONFIG_FILE_NAME);
                default_path.is_file().then_some(default_path)
            }
        };

        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        if let Some(path) = &config_file {
            tracing::debug!(path = %path.display(), "loading manifest");
            figment = figment.merge(Json::file(path));
        }

        // KILN_OUT_DIR=build, KILN_SERVER__PORT=4000, ...
        figment = figment.merge(
            Env::prefixed("KILN_")
                .lowercase(false)
                .map(|key| env_key_to_path(key.as_str()).into()),
        );

        figment = figment.merge(Serialized::defaults(overrides));

        let mut config: Self = figment.extract().map_err(|e| ConfigError::InvalidValue {
            field: "configuration".to_string(),
            value: e.to_string(),
            hint: format!("Check {} syntax and field types", CONFIG_FILE_NAME),
        })?;

        if config.cwd.is_none() {
            config.cwd = Some(root);
        }

        Ok(config)
    }
}

/// `SERVER__LIVE_RELOAD` -> `server.liveReload`
pub(crate) fn env_key_to_path(key: &str) -> String {
    key.split("__")
        .map(|segment| {
            let mut out = String::with_capacity(segment.len());
            let mut upper = false;
            for c in segment.chars() {
                if c == '_' {
                    upper = true;
                } else if upper {
                    out.push(c.to_ascii_uppercase());
                    upper = false;
                } else {
                    out.push(c.to_ascii_lowercase());
                }
            }
            out
        })
        .collect::<Vec<_>>()
        .join(".")
}
