//! Per-tick fan-out to connected clients.
//!
//! A client that has never been broadcast to gets the full population as a
//! `state` frame; everybody else gets the tick's `update` frame. The `new`
//! flag is cleared after the first attempt whether or not the send
//! succeeded.
//!
//! Send failures are logged and counted. Removing a client is left to its
//! own session loop.

use egol_types::{Population, ServerMessage, Updates};
use tracing::error;

use crate::registry::{ClientRegistry, Outbound, SendError};

/// Outcome counters for one broadcast pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Full-state frames attempted (one per new client).
    pub state_frames: usize,
    /// Update frames attempted.
    pub update_frames: usize,
    /// Sends that failed.
    pub failures: usize,
}

impl BroadcastReport {
    /// Total frames attempted.
    pub const fn attempted(&self) -> usize {
        self.state_frames.saturating_add(self.update_frames)
    }
}

/// Send this tick's frames to every client registered at entry.
///
/// Each frame is encoded at most once per pass and only if some client
/// needs it.
pub async fn broadcast<O: Outbound>(
    registry: &ClientRegistry<O>,
    population: &Population,
    updates: &Updates,
) -> BroadcastReport {
    let mut report = BroadcastReport::default();
    let mut state_frame: Option<Result<String, String>> = None;
    let mut update_frame: Option<Result<String, String>> = None;

    for client in registry.snapshot().await {
        let is_new = client.is_new();
        let frame = if is_new {
            state_frame.get_or_insert_with(|| encode(&ServerMessage::state(population)))
        } else {
            update_frame.get_or_insert_with(|| encode(&ServerMessage::update(updates)))
        };

        let result = match &*frame {
            Ok(text) => client.connection().send_text(text).await,
            Err(reason) => Err(SendError::Encode(reason.clone())),
        };

        if is_new {
            client.mark_established();
            report.state_frames = report.state_frames.saturating_add(1);
        } else {
            report.update_frames = report.update_frames.saturating_add(1);
        }

        if let Err(e) = result {
            error!(client_id = %client.id(), error = %e, "Broadcast send failed");
            report.failures = report.failures.saturating_add(1);
        }
    }

    report
}

fn encode(message: &ServerMessage<'_>) -> Result<String, String> {
    message.encode().map_err(|e| e.to_string())
}
