//! Connection-state observer delivery.
//!
//! State changes are pushed into an unbounded queue and a dedicated task
//! calls the observer, so the engine never waits on observer code while it
//! holds its lock, and the observer sees changes in the order they happened.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::ConnectionState;

/// Observer called with every new connection state.
pub type ConnectionHandler = Arc<dyn Fn(ConnectionState) + Send + Sync>;

#[derive(Default)]
pub(crate) struct StateNotifier {
    tx: Option<mpsc::UnboundedSender<ConnectionState>>,
}

impl StateNotifier {
    /// Install `handler`, replacing the previous observer. The previous
    /// consumer task drains what was already queued and exits. Must be called
    /// from within a tokio runtime.
    pub(crate) fn set_handler(&mut self, handler: ConnectionHandler) {
        let (tx, mut rx) = mpsc::unbounded_channel::<ConnectionState>();
        tokio::spawn(async move {
            while let Some(state) = rx.recv().await {
                handler(state);
            }
        });
        self.tx = Some(tx);
    }

    pub(crate) fn notify(&self, state: ConnectionState) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(state);
        }
    }
}
