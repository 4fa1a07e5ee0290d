//! `WebSocket` session handling for `/connect`.
//!
//! Each upgraded socket is split in two. The write half becomes the
//! client's [`WsOutbound`] and is registered so the tick loop can
//! broadcast to it. The read half is driven by [`run_session`], which
//! answers every inbound frame with `{"success":true}` if it parses as a
//! JSON object and `{"success":false}` otherwise. A bad frame never ends
//! the session; only a close frame, a read error, or the end of the
//! stream does.

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use chrono::Utc;
use egol_core::{Client, ClientRegistry, Outbound, SendError};
use egol_types::{ClientRequest, ServerMessage};
use futures::stream::{SplitSink, Stream};
use futures::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Write half of an upgraded socket.
///
/// The mutex keeps ack replies and tick broadcasts from interleaving on
/// the wire.
pub struct WsOutbound {
    sink: Mutex<SplitSink<WebSocket, Message>>,
}

impl WsOutbound {
    /// Wrap the write half of a socket.
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }
}

impl Outbound for WsOutbound {
    async fn send_text(&self, text: &str) -> Result<(), SendError> {
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(text.into()))
            .await
            .map_err(|e| SendError::Transport(e.to_string()))
    }

    async fn close(&self) {
        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.close().await {
            debug!("WebSocket close failed: {e}");
        }
    }
}

/// Upgrade an HTTP request to a `WebSocket` session.
///
/// # Route
///
/// `GET /connect`
pub async fn connect(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    info!("New connection");
    ws.on_failed_upgrade(|e| warn!(error = %e, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sink, stream) = socket.split();
    let client = Arc::new(Client::new(WsOutbound::new(sink)));
    run_session(&state.registry, client, stream).await;
}

/// Register `client`, answer inbound frames until the peer goes away,
/// then deregister it.
///
/// Generic over the inbound stream so sessions can be driven without a
/// real socket.
pub async fn run_session<O, S, E>(
    registry: &ClientRegistry<O>,
    client: Arc<Client<O>>,
    mut inbound: S,
) where
    O: Outbound,
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let client_id = client.id();
    registry.set(Arc::clone(&client)).await;
    let clients = registry.len().await;
    debug!(%client_id, clients, "Client registered");

    let reason = loop {
        match inbound.next().await {
            Some(Ok(Message::Text(text))) => respond(&client, text.as_str()).await,
            Some(Ok(Message::Binary(bytes))) => {
                respond(&client, &String::from_utf8_lossy(&bytes)).await;
            }
            Some(Ok(Message::Close(_))) => break "closed by peer".to_owned(),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            Some(Err(e)) => break format!("read error: {e}"),
            None => break "stream ended".to_owned(),
        }
    };

    client.connection().close().await;
    registry.remove(client_id).await;

    let session = Utc::now().signed_duration_since(client.connected_at());
    info!(
        %client_id,
        reason = %reason,
        session_secs = session.num_seconds(),
        "Connection lost"
    );
}

/// Characters of a rejected frame kept in the log line.
const LOGGED_FRAME_CHARS: usize = 64;

/// Build the reply to one inbound text frame.
pub fn handle_frame(text: &str) -> ServerMessage<'static> {
    match ClientRequest::parse(text) {
        Ok(_) => ServerMessage::ack(true),
        Err(e) => {
            warn!(
                error = %e,
                len = text.len(),
                frame = frame_preview(text),
                "Unable to parse message"
            );
            ServerMessage::ack(false)
        }
    }
}

/// The first [`LOGGED_FRAME_CHARS`] characters of `text`.
fn frame_preview(text: &str) -> &str {
    text.char_indices()
        .nth(LOGGED_FRAME_CHARS)
        .and_then(|(end, _)| text.get(..end))
        .unwrap_or(text)
}

async fn respond<O: Outbound>(client: &Client<O>, text: &str) {
    let reply = match handle_frame(text).encode() {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to encode ack: {e}");
            return;
        }
    };
    if let Err(e) = client.connection().send_text(&reply).await {
        warn!(client_id = %client.id(), error = %e, "Failed to send ack");
    }
}
