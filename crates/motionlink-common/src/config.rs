//! ---
//! ml_section: "01-core-functionality"
//! ml_subsection: "module"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Shared client configuration and logging primitives."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;
use url::Url;

use crate::logging::LogFormat;

fn default_host() -> String {
    "lilygo-motioncontroller.local".to_owned()
}

fn default_path() -> String {
    "/ws".to_owned()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Client configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// An [`AppConfig`] together with the file it came from, if any.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "MOTIONLINK_CONFIG";

    /// Load configuration from disk, respecting the `MOTIONLINK_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load the first configuration that exists; the env override wins and must exist.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Some(loaded) = Self::load_from_env()? {
            return Ok(loaded);
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Like [`AppConfig::load_with_source`], but fall back to defaults when no
    /// candidate exists. A file that exists and fails to parse is still an error.
    pub fn load_or_default<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Some(loaded) = Self::load_from_env()? {
            return Ok(loaded);
        }
        match candidates.iter().find(|c| c.as_ref().exists()) {
            Some(candidate) => {
                let path = candidate.as_ref().to_path_buf();
                Ok(LoadedAppConfig {
                    config: Self::from_path(&path)?,
                    source: Some(path),
                })
            }
            None => {
                debug!("no configuration file found; using defaults");
                Ok(LoadedAppConfig {
                    config: AppConfig::default(),
                    source: None,
                })
            }
        }
    }

    fn load_from_env() -> Result<Option<LoadedAppConfig>> {
        match std::env::var(Self::ENV_CONFIG_PATH) {
            Ok(env_path) if !env_path.trim().is_empty() => {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                Ok(Some(LoadedAppConfig {
                    config,
                    source: Some(path),
                }))
            }
            _ => Ok(None),
        }
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.device.websocket_url()?;
        self.reconnect.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Where the motion controller lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Use `wss` instead of `ws`.
    #[serde(default)]
    pub secure: bool,
    /// Full endpoint; overrides `host`, `path` and `secure` when set.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            path: default_path(),
            secure: false,
            url: None,
        }
    }
}

impl DeviceConfig {
    /// Resolve the WebSocket endpoint.
    pub fn websocket_url(&self) -> Result<Url> {
        let raw = match &self.url {
            Some(url) => url.clone(),
            None => {
                let scheme = if self.secure { "wss" } else { "ws" };
                let path = if self.path.starts_with('/') {
                    self.path.clone()
                } else {
                    format!("/{}", self.path)
                };
                format!("{}://{}{}", scheme, self.host, path)
            }
        };
        let url = Url::parse(&raw).with_context(|| format!("invalid device url {}", raw))?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(anyhow!(
                "device url {} must use ws or wss, not {}",
                raw,
                other
            )),
        }
    }
}

/// Automatic reconnection budget.
#[serde_as]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay", rename = "delay_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub delay: Duration,
    /// Pause before the very first connection attempt.
    #[serde(default = "default_initial_delay", rename = "initial_delay_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub initial_delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay: default_retry_delay(),
            initial_delay: default_initial_delay(),
        }
    }
}

impl ReconnectConfig {
    pub fn validate(&self) -> Result<()> {
        if self.delay.is_zero() {
            return Err(anyhow!("reconnect delay_ms must be greater than zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}
