//! Shared application state for the HTTP server.

use egol_core::ClientRegistry;

use crate::ws::WsOutbound;

/// State shared by every request handler.
///
/// The registry is the same instance the tick loop broadcasts to.
#[derive(Clone, Default)]
pub struct AppState {
    /// Connected websocket clients.
    pub registry: ClientRegistry<WsOutbound>,
}

impl AppState {
    /// Wrap an existing registry.
    pub const fn new(registry: ClientRegistry<WsOutbound>) -> Self {
        Self { registry }
    }
}
