//! HTTP front end for the Egol simulation server.
//!
//! One Axum listener serves:
//!
//! - **`WebSocket` endpoint** (`/connect`): clients receive a full `state`
//!   frame on the first tick after they join and `update` frames after
//!   that; every frame they send is answered with a bare success ack
//! - **Static files** (`/*`) from the configured public directory
//!
//! The server also owns signal handling. On `SIGINT`/`SIGTERM` it drains
//! and then runs the exit handshake with the tick loop (see
//! [`egol_core::shutdown`]).
//!
//! # Modules
//!
//! - [`router`] -- Route table and middleware
//! - [`server`] -- Bind, serve, and shutdown
//! - [`state`] -- Shared handler state
//! - [`ws`] -- `WebSocket` sessions
//! - [`error`] -- Error types

pub mod error;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ServerError;
pub use router::build_router;
pub use server::{ServerConfig, shutdown_signal, start_server};
pub use state::AppState;
pub use ws::WsOutbound;
