//! Development session configuration.
//!
//! Extends the base KilnConfig with what a session needs to run: where the dev
//! server listens, or which process to supervise.

use crate::config::KilnConfig;
use crate::dev::ProcessCommand;
use crate::error::{ConfigError, Result};
use std::net::{IpAddr, SocketAddr, TcpListener, ToSocketAddrs};
use std::path::Path;

/// What a session keeps up to date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DevTarget {
    /// Static server plus live reload for browsers
    Serve { addr: SocketAddr },
    /// A headless process restarted after each successful rebuild
    Supervise { command: ProcessCommand },
}

/// Development session configuration.
#[derive(Debug, Clone)]
pub struct DevConfig {
    /// Base configuration
    pub base: KilnConfig,

    pub target: DevTarget,
}

impl DevConfig {
    /// Session serving the output directory over HTTP.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or no port near the
    /// configured one is free
    pub fn serve(base: KilnConfig) -> Result<Self> {
        base.validate()?;
        let addr = Self::find_available_port(&base.server.host, base.server.port)?;
        Ok(Self {
            base,
            target: DevTarget::Serve { addr },
        })
    }

    /// Session supervising the `run` command (or the default node command).
    pub fn supervise(base: KilnConfig) -> Result<Self> {
        base.validate()?;
        let argv: Vec<String> = base
            .run
            .clone()
            .unwrap_or_else(|| default_run_command(&base))
            .iter()
            .map(|arg| base.substitute(arg))
            .collect();
        let command = ProcessCommand::from_argv(&argv, base.project_root())?;
        Ok(Self {
            base,
            target: DevTarget::Supervise { command },
        })
    }

    /// Find an available port starting from the requested port.
    ///
    /// Tries the requested port first, then the next ten. Port 0 lets the OS
    /// pick when the server binds.
    pub fn find_available_port(host: &str, requested_port: u16) -> Result<SocketAddr> {
        let ip = resolve_host(host, requested_port)?;

        if requested_port != 0 && requested_port < 1024 {
            crate::ui::warning(&format!(
                "Port {} is in privileged range, may require root access",
                requested_port
            ));
        }

        let addr = SocketAddr::new(ip, requested_port);
        if requested_port == 0 || TcpListener::bind(addr).is_ok() {
            return Ok(addr);
        }

        for offset in 1..=10 {
            let port = requested_port.saturating_add(offset);
            let addr = SocketAddr::new(ip, port);
            if TcpListener::bind(addr).is_ok() {
                crate::ui::warning(&format!(
                    "Port {} is busy, using port {} instead",
                    requested_port, port
                ));
                return Ok(addr);
            }
        }

        Err(ConfigError::InvalidValue {
            field: "server.port".to_string(),
            value: requested_port.to_string(),
            hint: format!(
                "Ports {}-{} are all in use. Try a different port range.",
                requested_port,
                requested_port.saturating_add(10)
            ),
        }
        .into())
    }
}

fn resolve_host(host: &str, port: u16) -> Result<IpAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    (host, port)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .map(|addr| addr.ip())
        .ok_or_else(|| {
            ConfigError::InvalidValue {
                field: "server.host".to_string(),
                value: host.to_string(),
                hint: "Use an IP address such as 127.0.0.1 or a resolvable host name".to_string(),
            }
            .into()
        })
}

/// `node <outDir>/<entry stem>.js`, used when no `run` command is configured.
pub fn default_run_command(config: &KilnConfig) -> Vec<String> {
    let stem = Path::new(&config.entry)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index".to_string());
    let script = config.out_path().join(format!("{}.js", stem));
    vec!["node".to_string(), script.display().to_string()]
}
