//! HTTP server lifecycle management.
//!
//! Provides [`start_server`] which binds to a TCP port and serves the
//! router until `SIGINT` or `SIGTERM`. Once HTTP has drained, the tick
//! loop is told to stop and the server waits for its acknowledgement.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use egol_core::ShutdownTrigger;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::ServerError;
use crate::router::build_router;
use crate::state::AppState;

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// The TCP port to listen on.
    pub port: u16,
    /// Directory served at `/`.
    pub public_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8080,
            public_dir: PathBuf::from("public"),
        }
    }
}

/// Start the HTTP server.
///
/// Binds to the configured address, builds the router, and serves
/// requests until a termination signal arrives. Whether serving ended
/// cleanly or not, the tick loop is then told to stop and this waits for
/// its acknowledgement before returning.
///
/// # Errors
///
/// Returns [`ServerError::PublicDir`] if the static directory is missing,
/// [`ServerError::Bind`] if the listener cannot bind, or
/// [`ServerError::Serve`] on a fatal I/O error.
pub async fn start_server(
    config: &ServerConfig,
    state: Arc<AppState>,
    trigger: ShutdownTrigger,
) -> Result<(), ServerError> {
    let served = serve(config, state).await;
    match &served {
        Ok(()) => info!("Server stopped"),
        Err(e) => error!(error = %e, "Server failed"),
    }

    info!("Stopping tick loop");
    if trigger.request().await {
        info!("Tick loop acknowledged exit");
    } else {
        warn!("Tick loop had already ended");
    }
    served
}

async fn serve(config: &ServerConfig, state: Arc<AppState>) -> Result<(), ServerError> {
    if !config.public_dir.is_dir() {
        return Err(ServerError::PublicDir {
            path: config.public_dir.display().to_string(),
        });
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))?;

    let router = build_router(state, &config.public_dir);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;

    info!(%addr, public_dir = %config.public_dir.display(), "Server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))
}

/// Resolve on the first `SIGINT` (Ctrl-C) or, on Unix, `SIGTERM`.
///
/// A handler that fails to install is logged and never fires.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT"),
        () = terminate => info!("Received SIGTERM"),
    }
}
