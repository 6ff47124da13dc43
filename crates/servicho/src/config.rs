//! Server configuration.
//!
//! Sources, lowest to highest priority:
//! defaults → `servicho.config.json` in the root (or `--config`) →
//! `SERVICHO_*` environment variables → CLI flags.

use crate::error::{ConfigError, Result};
use crate::ports::{self, SESSION_PORT_COUNT};
use crate::reload_stub::ReconnectPolicy;
use crate::watcher::WatchOptions;
use figment::{
    providers::{Env, Format as _, Json, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the served root.
pub const CONFIG_FILE_NAME: &str = "servicho.config.json";

/// Environment variable prefix, e.g. `SERVICHO_PORTS=[14001,14002]`.
pub const ENV_PREFIX: &str = "SERVICHO_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface both listeners bind to
    pub host: IpAddr,
    /// Candidate ports, probed in order
    pub ports: Vec<u16>,
    pub reconnect_interval_ms: u64,
    pub max_disconnected_ms: u64,
    /// Per-path debounce for change events; 0 disables it
    pub debounce_ms: u64,
    /// Extra watch ignore patterns on top of hidden paths
    pub watch_ignore: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let policy = ReconnectPolicy::default();
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            ports: ports::default_pool(),
            reconnect_interval_ms: policy.interval_ms,
            max_disconnected_ms: policy.max_disconnected_ms,
            debounce_ms: 50,
            watch_ignore: Vec::new(),
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub host: Option<IpAddr>,
}

impl ServerConfig {
    /// Load configuration for serving `root`.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config file is missing or any source
    /// fails to parse.
    pub fn load(root: &Path, overrides: &ConfigOverrides) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config_file = match &overrides.config_path {
            Some(path) if !path.exists() => {
                return Err(ConfigError::InvalidValue {
                    field: "config".to_string(),
                    value: path.display().to_string(),
                    hint: "Config file does not exist".to_string(),
                }
                .into());
            }
            Some(path) => Some(path.clone()),
            None => {
                let default_path = root.join(CONFIG_FILE_NAME);
                default_path.exists().then_some(default_path)
            }
        };

        if let Some(path) = config_file {
            tracing::debug!(path = %path.display(), "loading config file");
            figment = figment.merge(Json::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        if let Some(host) = overrides.host {
            figment = figment.merge(Serialized::default("host", host));
        }

        let config: Self = figment
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the port pool cannot hold a session or the reconnect
    /// interval is zero.
    pub fn validate(&self) -> Result<()> {
        let mut distinct = self.ports.clone();
        distinct.sort_unstable();
        distinct.dedup();

        if distinct.len() < SESSION_PORT_COUNT {
            return Err(ConfigError::InvalidValue {
                field: "ports".to_string(),
                value: format!("{:?}", self.ports),
                hint: format!("List at least {} distinct ports", SESSION_PORT_COUNT),
            }
            .into());
        }

        if distinct.first() == Some(&0) {
            return Err(ConfigError::InvalidValue {
                field: "ports".to_string(),
                value: format!("{:?}", self.ports),
                hint: "Port 0 cannot be shown to the browser; list fixed ports".to_string(),
            }
            .into());
        }

        if self.reconnect_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "reconnect_interval_ms".to_string(),
                value: "0".to_string(),
                hint: "Use a positive interval, e.g. 100".to_string(),
            }
            .into());
        }

        Ok(())
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            interval_ms: self.reconnect_interval_ms,
            max_disconnected_ms: self.max_disconnected_ms,
        }
    }

    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            ignore_patterns: self.watch_ignore.clone(),
            debounce: Duration::from_millis(self.debounce_ms),
        }
    }
}
