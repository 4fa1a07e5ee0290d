//! Connected-client registry shared by the accept loop and the tick loop.
//!
//! The registry is the only structure written from more than one task.
//! The lock is held just long enough to insert, remove, or copy out the
//! current member list; broadcasting always works on that copy, so
//! membership changes during a broadcast cannot corrupt it and no client
//! can appear twice in one pass.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use egol_types::ClientId;
use tokio::sync::RwLock;

/// Errors that can occur when sending a frame to a client.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The peer has gone away.
    #[error("connection closed")]
    Closed,

    /// The transport failed while writing.
    #[error("transport error: {0}")]
    Transport(String),

    /// The frame could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),
}

/// Outbound half of a client connection.
///
/// Sends are awaited one after another by the broadcaster, so a slow
/// implementation delays every client behind it in the same tick.
pub trait Outbound: Send + Sync + 'static {
    /// Write one text frame.
    fn send_text(&self, text: &str) -> impl Future<Output = Result<(), SendError>> + Send;

    /// Close the connection. Errors are swallowed; the peer may already
    /// be gone.
    fn close(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// A connected consumer session.
#[derive(Debug)]
pub struct Client<O> {
    id: ClientId,
    conn: O,
    /// True until the first broadcast attempt for this client.
    new: AtomicBool,
    connected_at: DateTime<Utc>,
}

impl<O: Outbound> Client<O> {
    /// Mint a fresh, not-yet-broadcast-to client around `conn`.
    pub fn new(conn: O) -> Self {
        Self {
            id: ClientId::new(),
            conn,
            new: AtomicBool::new(true),
            connected_at: Utc::now(),
        }
    }

    /// Return the client ID.
    pub const fn id(&self) -> ClientId {
        self.id
    }

    /// Return the outbound connection.
    pub const fn connection(&self) -> &O {
        &self.conn
    }

    /// Wall-clock time the client was registered.
    pub const fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Whether the client still awaits its first broadcast.
    pub fn is_new(&self) -> bool {
        self.new.load(Ordering::Acquire)
    }

    /// Clear the `new` flag. Returns whether it was set.
    pub fn mark_established(&self) -> bool {
        self.new.swap(false, Ordering::AcqRel)
    }
}

/// Concurrent map from client ID to client.
///
/// Cloning yields another handle to the same registry.
pub struct ClientRegistry<O> {
    clients: Arc<RwLock<HashMap<ClientId, Arc<Client<O>>>>>,
}

impl<O> Clone for ClientRegistry<O> {
    fn clone(&self) -> Self {
        Self {
            clients: Arc::clone(&self.clients),
        }
    }
}

impl<O> Default for ClientRegistry<O> {
    fn default() -> Self {
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<O: Outbound> ClientRegistry<O> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `client` under its own ID, replacing any previous entry.
    pub async fn set(&self, client: Arc<Client<O>>) {
        self.clients.write().await.insert(client.id(), client);
    }

    /// Deregister a client. Returns it if it was present.
    pub async fn remove(&self, id: ClientId) -> Option<Arc<Client<O>>> {
        self.clients.write().await.remove(&id)
    }

    /// Point-in-time copy of the current members.
    pub async fn snapshot(&self) -> Vec<Arc<Client<O>>> {
        self.clients.read().await.values().cloned().collect()
    }

    /// Number of registered clients.
    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Whether no client is registered.
    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct NullConn;

    impl Outbound for NullConn {
        async fn send_text(&self, _text: &str) -> Result<(), SendError> {
            Ok(())
        }
    }

    #[test]
    fn new_flag_clears_exactly_once() {
        let client = Client::new(NullConn);
        assert!(client.is_new());
        assert!(client.mark_established());
        assert!(!client.is_new());
        assert!(!client.mark_established());
    }

    #[tokio::test]
    async fn set_remove_and_snapshot() {
        let registry = ClientRegistry::new();
        let a = Arc::new(Client::new(NullConn));
        let b = Arc::new(Client::new(NullConn));
        registry.set(Arc::clone(&a)).await;
        registry.set(Arc::clone(&b)).await;
        assert_eq!(registry.len().await, 2);

        let snapshot = registry.snapshot().await;
        let removed = registry.remove(a.id()).await;
        assert!(removed.is_some());
        assert!(registry.remove(a.id()).await.is_none());

        // The earlier snapshot is unaffected by the removal.
        assert_eq!(snapshot.len(), 2);
        let ids: Vec<ClientId> = registry.snapshot().await.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec![b.id()]);
    }

    #[tokio::test]
    async fn re_registering_does_not_duplicate() {
        let registry = ClientRegistry::new();
        let client = Arc::new(Client::new(NullConn));
        registry.set(Arc::clone(&client)).await;
        registry.set(Arc::clone(&client)).await;
        assert_eq!(registry.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn clones_share_membership() {
        let registry = ClientRegistry::new();
        let other = registry.clone();
        other.set(Arc::new(Client::new(NullConn))).await;
        assert!(!registry.is_empty().await);
    }

    #[tokio::test]
    async fn concurrent_registration() {
        let registry = ClientRegistry::new();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let client = Arc::new(Client::new(NullConn));
                registry.set(Arc::clone(&client)).await;
                let _ = registry.snapshot().await;
                client.id()
            }));
        }
        for handle in handles {
            let id = handle.await.unwrap();
            assert!(registry.remove(id).await.is_some());
        }
        assert!(registry.is_empty().await);
    }
}
