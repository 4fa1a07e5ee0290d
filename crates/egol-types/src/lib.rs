//! Shared type definitions for the Egol simulation server.
//!
//! Every crate in the workspace speaks in these types: the tick loop
//! mutates [`Population`], produces [`Updates`], and the websocket layer
//! encodes [`ServerMessage`] frames. Types that the browser client reads
//! also derive `ts-rs` bindings.
//!
//! # Modules
//!
//! - [`ids`] -- Random UUID wrappers for organisms and clients
//! - [`organism`] -- Organism state, attributes, and per-tick updates
//! - [`message`] -- Websocket frames in both directions

pub mod ids;
pub mod message;
pub mod organism;

// Re-export all public types at crate root for convenience.
pub use ids::{ClientId, OrganismId};
pub use message::{ClientRequest, MessageKind, Payload, ServerMessage};
pub use organism::{Attributes, LifeState, Organism, Population, Position, State, Update, Updates};
