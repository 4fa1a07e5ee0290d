//! One-shot exit handshake between the HTTP server and the tick loop.
//!
//! The server holds a [`ShutdownTrigger`]. Once its own graceful shutdown
//! has finished it calls [`ShutdownTrigger::request`], which asserts the
//! exit signal and waits for the loop to acknowledge. The tick loop polls
//! its [`ShutdownListener`] without blocking at the top of every
//! iteration and acknowledges after it has stopped.

use tokio::sync::oneshot;

/// Create a linked trigger/listener pair.
pub fn channel() -> (ShutdownTrigger, ShutdownListener) {
    let (tx, rx) = oneshot::channel();
    (ShutdownTrigger { tx }, ShutdownListener { rx, ack: None })
}

/// Initiator side of the exit handshake.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: oneshot::Sender<oneshot::Sender<()>>,
}

impl ShutdownTrigger {
    /// Assert the exit signal and wait for the loop to acknowledge it.
    ///
    /// Returns `true` if the loop acknowledged, `false` if the listener
    /// was dropped first (the loop had already ended).
    pub async fn request(self) -> bool {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(ack_tx).is_err() {
            return false;
        }
        ack_rx.await.is_ok()
    }
}

/// Loop side of the exit handshake.
#[derive(Debug)]
pub struct ShutdownListener {
    rx: oneshot::Receiver<oneshot::Sender<()>>,
    ack: Option<oneshot::Sender<()>>,
}

impl ShutdownListener {
    /// Non-blocking check of the exit signal. Stays `true` once observed.
    pub fn is_requested(&mut self) -> bool {
        if self.ack.is_some() {
            return true;
        }
        match self.rx.try_recv() {
            Ok(ack) => {
                self.ack = Some(ack);
                true
            }
            Err(_) => false,
        }
    }

    /// Acknowledge the exit back to the initiator, if it asked.
    pub fn acknowledge(mut self) {
        if let Some(ack) = self.ack.take() {
            // The initiator may have stopped waiting; nothing to do then.
            let _ = ack.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listener_is_quiet_until_requested() {
        let (trigger, mut listener) = channel();
        assert!(!listener.is_requested());
        assert!(!listener.is_requested());

        let waiter = tokio::spawn(trigger.request());
        tokio::task::yield_now().await;

        // Spin until the request lands (spawned task may not have run yet).
        while !listener.is_requested() {
            tokio::task::yield_now().await;
        }
        assert!(listener.is_requested());
        listener.acknowledge();

        assert!(matches!(waiter.await, Ok(true)));
    }

    #[tokio::test]
    async fn request_returns_false_when_loop_is_gone() {
        let (trigger, listener) = channel();
        drop(listener);
        assert!(!trigger.request().await);
    }

    #[tokio::test]
    async fn dropped_trigger_never_signals() {
        let (trigger, mut listener) = channel();
        drop(trigger);
        assert!(!listener.is_requested());
    }
}
