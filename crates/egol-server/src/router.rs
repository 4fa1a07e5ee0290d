//! Axum router construction.
//!
//! Two surfaces share one listener: the `/connect` websocket and a static
//! file tree mounted at `/`. Everything is gzip-compressed when the client
//! accepts it.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::ws;

/// Build the complete router.
///
/// The router includes:
/// - `GET /connect` -- `WebSocket` session (acks + tick broadcasts)
/// - `GET /*` -- files under `public_dir`, `index.html` for directories
pub fn build_router(state: Arc<AppState>, public_dir: &Path) -> Router {
    Router::new()
        .route("/connect", get(ws::connect))
        .fallback_service(ServeDir::new(public_dir))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
