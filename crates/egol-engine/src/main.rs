//! Egol simulation server binary.
//!
//! Wires the tick loop to its store and to the HTTP/WebSocket front end,
//! then runs until `SIGINT` or `SIGTERM`.
//!
//! # Startup Sequence
//!
//! 1. Parse flags and resolve configuration (defaults, YAML, env, flags)
//! 2. Initialize structured logging (tracing)
//! 3. Connect the key-value store (Redis, or memory with `--memory-store`)
//! 4. Spawn the initial population and create the frame clock
//! 5. Spawn the tick loop
//! 6. Serve HTTP until a termination signal, then run the exit handshake
//! 7. Collect the tick loop result, log it, and close the store

mod cli;
mod error;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use egol_core::config::{LogFormat, LoggingConfig};
use egol_core::runner::{self, Simulation};
use egol_core::{
    ClientRegistry, FrameClock, KeyValueStore, MemoryStore, SimConfig, SnapshotPersister,
    population, shutdown,
};
use egol_db::RedisStore;
use egol_server::{AppState, ServerConfig, WsOutbound};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::error::EngineError;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the store or listener
/// cannot be set up, or the tick loop task fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Resolve configuration.
    let config = cli.resolve().context("failed to load configuration")?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(
        sim_id = config.sim_id,
        frame_ms = config.frame_ms,
        port = config.port,
        public_dir = %config.public_dir.display(),
        population = config.population,
        "egol-engine starting"
    );

    // 3. Connect the store and run.
    if cli.memory_store {
        info!("Using in-memory store; tick records will not survive exit");
        run(&config, MemoryStore::new()).await?;
    } else {
        let url = config.redis_url();
        let store = RedisStore::connect(&url)
            .await
            .map_err(EngineError::from)
            .with_context(|| format!("failed to connect to Redis at {url}"))?;
        let result = run(&config, store.clone()).await;
        if let Err(e) = store.quit().await {
            warn!(error = %e, "Failed to close Redis connection");
        }
        result?;
    }

    info!("egol-engine shutdown complete");
    Ok(())
}

/// Run the tick loop and the HTTP server against `store` until shutdown.
async fn run<S>(config: &SimConfig, store: S) -> Result<(), EngineError>
where
    S: KeyValueStore + 'static,
{
    // 4. Spawn the population and create the frame clock.
    let population = population::spawn(config.population, &mut rand::rng());
    let clock = FrameClock::new(config.frame_ms)?;
    info!(organisms = population.len(), "Initial population spawned");

    let registry: ClientRegistry<WsOutbound> = ClientRegistry::new();
    let mut sim = Simulation {
        population,
        clock,
        persister: SnapshotPersister::new(config.sim_id.clone(), store),
        registry: registry.clone(),
    };

    // 5. Spawn the tick loop.
    let (trigger, listener) = shutdown::channel();
    let tick_loop = tokio::spawn(async move { runner::run_simulation(&mut sim, listener).await });

    // 6. Serve until a termination signal.
    let server_config = ServerConfig {
        port: config.port,
        public_dir: config.public_dir.clone(),
        ..ServerConfig::default()
    };
    let state = Arc::new(AppState::new(registry));
    let served = egol_server::start_server(&server_config, state, trigger).await;

    // 7. The handshake is done; collect the loop's result.
    let result = tick_loop.await.map_err(|e| EngineError::TickLoop {
        message: e.to_string(),
    })??;
    runner::log_simulation_end(&result);
    served?;
    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match logging.format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
