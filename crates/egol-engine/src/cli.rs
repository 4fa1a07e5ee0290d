//! Command-line interface.
//!
//! Flags sit on top of the configuration layers: defaults, then the YAML
//! file named by `--config`, then environment variables, then these flags.

use std::path::PathBuf;

use clap::Parser;
use egol_core::SimConfig;
use egol_core::config::{ConfigError, LogFormat};

/// Egol artificial-life simulation server.
#[derive(Debug, Parser)]
#[command(name = "egol-engine", version, about)]
pub struct Cli {
    /// YAML configuration file.
    #[arg(long, env = "EGOL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Simulation ID; prefixes every persisted key.
    #[arg(long)]
    pub sim_id: Option<String>,

    /// Target milliseconds between tick starts.
    #[arg(long)]
    pub frame_ms: Option<u64>,

    /// HTTP listener port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory served at `/`.
    #[arg(long)]
    pub public_dir: Option<PathBuf>,

    /// Redis host name.
    #[arg(long)]
    pub redis_host: Option<String>,

    /// Redis port.
    #[arg(long)]
    pub redis_port: Option<u16>,

    /// Number of organisms spawned at startup.
    #[arg(long)]
    pub population: Option<usize>,

    /// Log output format (`pretty` or `json`).
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// Keep tick records in process memory instead of Redis.
    #[arg(long)]
    pub memory_store: bool,
}

impl Cli {
    /// Build the effective configuration from every layer and validate it.
    pub fn resolve(&self) -> Result<SimConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => SimConfig::from_file(path)?,
            None => {
                let mut config = SimConfig::default();
                config.apply_env_overrides()?;
                config
            }
        };
        self.apply_to(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Overwrite every field that was given on the command line.
    pub fn apply_to(&self, config: &mut SimConfig) {
        if let Some(sim_id) = &self.sim_id {
            config.sim_id.clone_from(sim_id);
        }
        if let Some(frame_ms) = self.frame_ms {
            config.frame_ms = frame_ms;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(public_dir) = &self.public_dir {
            config.public_dir.clone_from(public_dir);
        }
        if let Some(redis_host) = &self.redis_host {
            config.redis_host.clone_from(redis_host);
        }
        if let Some(redis_port) = self.redis_port {
            config.redis_port = redis_port;
        }
        if let Some(population) = self.population {
            config.population = population;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
    }
}
