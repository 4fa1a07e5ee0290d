//! Frames exchanged over the `/connect` websocket.
//!
//! Server to client:
//!
//! | Frame | When |
//! |-------|------|
//! | `{"type":"state","data":{..population..},"success":true}` | first broadcast to a client |
//! | `{"type":"update","data":{..updates..},"success":true}` | every later broadcast |
//! | `{"success":true}` / `{"success":false}` | reply to an inbound frame |
//!
//! Client to server frames are opaque JSON objects. The server only checks
//! that they parse.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::organism::{Population, Updates};

/// Discriminator of a broadcast frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum MessageKind {
    /// Full population snapshot.
    State,
    /// Per-tick update set.
    Update,
}

/// Borrowed broadcast payload.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum Payload<'a> {
    /// The whole population.
    State(&'a Population),
    /// One iteration's updates.
    Update(&'a Updates),
}

/// A server-to-client frame.
///
/// Borrows its payload so the tick loop can encode a frame without
/// cloning the population.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ServerMessage<'a> {
    /// Frame discriminator. Absent on acks.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageKind>,
    /// Frame payload. Absent on acks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Payload<'a>>,
    /// Whether the server considers the exchange successful.
    pub success: bool,
}

impl<'a> ServerMessage<'a> {
    /// Full-state frame sent to a client on its first broadcast.
    pub const fn state(population: &'a Population) -> Self {
        Self {
            kind: Some(MessageKind::State),
            data: Some(Payload::State(population)),
            success: true,
        }
    }

    /// Incremental frame sent to established clients.
    pub const fn update(updates: &'a Updates) -> Self {
        Self {
            kind: Some(MessageKind::Update),
            data: Some(Payload::Update(updates)),
            success: true,
        }
    }
}

impl ServerMessage<'static> {
    /// Bare acknowledgement of an inbound frame.
    pub const fn ack(success: bool) -> Self {
        Self {
            kind: None,
            data: None,
            success,
        }
    }
}

impl ServerMessage<'_> {
    /// Encode as a JSON text frame.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// An inbound client frame.
///
/// Any JSON object is accepted. No field is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRequest {
    /// Raw fields of the request object.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl ClientRequest {
    /// Parse a text frame into a request.
    ///
    /// # Errors
    ///
    /// Fails if the text is not a JSON object.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
