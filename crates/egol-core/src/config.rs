//! Configuration loading and typed config structures for the Egol server.
//!
//! Configuration is layered, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. An optional YAML file (`--config egol.yaml`)
//! 3. Environment variables (`EGOL_SIM_ID`, `REDIS_HOST`, `REDIS_PORT`)
//! 4. Command-line flags (applied by the engine binary)
//!
//! [`SimConfig::validate`] runs last. `sim_id` has no default and must be
//! supplied by one of the layers.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::population::DEFAULT_POPULATION;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is missing or out of range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimConfig {
    /// Prefix of every persisted key. Required.
    #[serde(default)]
    pub sim_id: String,

    /// Target milliseconds between tick starts.
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,

    /// HTTP listener port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served at `/*`.
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,

    /// Redis host name.
    #[serde(default = "default_redis_host")]
    pub redis_host: String,

    /// Redis port.
    #[serde(default = "default_redis_port")]
    pub redis_port: u16,

    /// Number of organisms spawned at startup.
    #[serde(default = "default_population")]
    pub population: usize,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            sim_id: String::new(),
            frame_ms: default_frame_ms(),
            port: default_port(),
            public_dir: default_public_dir(),
            redis_host: default_redis_host(),
            redis_port: default_redis_port(),
            population: default_population(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SimConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::Invalid`] if an environment override is malformed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if an environment override is malformed.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Override fields from process environment variables when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `REDIS_PORT` is not a port number.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Override fields from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `REDIS_PORT` is not a port number.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("EGOL_SIM_ID") {
            self.sim_id = val;
        }
        if let Some(val) = lookup("REDIS_HOST") {
            self.redis_host = val;
        }
        if let Some(val) = lookup("REDIS_PORT") {
            self.redis_port = val.parse().map_err(|e| ConfigError::Invalid {
                reason: format!("REDIS_PORT={val} is not a valid port: {e}"),
            })?;
        }
        Ok(())
    }

    /// Check that every required value is present and in range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let reason = if self.sim_id.trim().is_empty() {
            "sim_id is required"
        } else if self.frame_ms == 0 {
            "frame_ms must be at least 1"
        } else if self.port == 0 {
            "port must be non-zero"
        } else if self.redis_port == 0 {
            "redis_port must be non-zero"
        } else if self.population == 0 {
            "population must be at least 1"
        } else {
            return Ok(());
        };
        Err(ConfigError::Invalid {
            reason: reason.to_owned(),
        })
    }

    /// Redis connection URL.
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}", self.redis_host, self.redis_port)
    }

    /// Frame period as a [`Duration`].
    pub const fn frame(&self) -> Duration {
        Duration::from_millis(self.frame_ms)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (overridden by `RUST_LOG`).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

const fn default_frame_ms() -> u64 {
    1_000
}

const fn default_port() -> u16 {
    8080
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_redis_host() -> String {
    "localhost".to_owned()
}

const fn default_redis_port() -> u16 {
    6379
}

const fn default_population() -> usize {
    DEFAULT_POPULATION
}

fn default_log_level() -> String {
    "info".to_owned()
}
