//! Push channel hub: WebSocket clients waiting for a reload signal.
//!
//! Every browser tab that loaded an injected page holds one WebSocket to the
//! hub. The hub never addresses a single client; [`PushHub::broadcast`] is
//! the only way to talk to them.

use crate::error::{Result, ServeError};
use crate::watcher::{ChangeEvent, ChangeKind};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    Router,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Payload sent to clients when something under the root changed.
pub const REFRESH_SIGNAL: &str = "refresh";

/// Outbound messages buffered per client.
const CLIENT_QUEUE_CAPACITY: usize = 16;

/// Live connections: handle -> outbound queue of the connection task.
pub type ClientRegistry = RwLock<HashMap<usize, mpsc::Sender<String>>>;

/// Broadcast hub for the push channel.
#[derive(Default)]
pub struct PushHub {
    clients: ClientRegistry,
    next_client_id: AtomicUsize,
}

impl PushHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new client.
    ///
    /// # Returns
    ///
    /// Client handle and receiver for signals addressed to it
    pub fn register_client(&self) -> (usize, mpsc::Receiver<String>) {
        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(CLIENT_QUEUE_CAPACITY);
        self.clients.write().insert(id, tx);
        (id, rx)
    }

    /// Unregister a client.
    pub fn unregister_client(&self, id: usize) {
        self.clients.write().remove(&id);
    }

    /// Get number of connected clients.
    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Send `signal` to every live client.
    ///
    /// Iterates a snapshot of the registry so connects and disconnects never
    /// race with the iteration. Clients whose connection is gone are removed
    /// afterwards; a client with a full queue already has a pending signal
    /// and is kept.
    ///
    /// # Returns
    ///
    /// Number of clients the signal was queued for
    pub fn broadcast(&self, signal: &str) -> usize {
        let clients: Vec<(usize, mpsc::Sender<String>)> = self
            .clients
            .read()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut delivered = 0;
        let mut failed_ids = Vec::new();

        for (id, tx) in clients {
            match tx.try_send(signal.to_string()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(client = id, "client queue full, skipping");
                }
                Err(TrySendError::Closed(_)) => failed_ids.push(id),
            }
        }

        if !failed_ids.is_empty() {
            let mut registry = self.clients.write();
            for id in failed_ids {
                tracing::debug!(client = id, "pruning closed client");
                registry.remove(&id);
            }
        }

        delivered
    }

    /// React to one watcher event.
    ///
    /// Modifications broadcast [`REFRESH_SIGNAL`]; errors are only logged.
    pub fn on_change_event(&self, event: &ChangeEvent) -> usize {
        match &event.kind {
            ChangeKind::Modified => {
                crate::ui::info(&format!("File changed: {}", event.path.display()));
                let delivered = self.broadcast(REFRESH_SIGNAL);
                tracing::debug!(clients = delivered, "refresh broadcast");
                delivered
            }
            ChangeKind::Error(message) => {
                crate::ui::warning(&format!(
                    "Watcher error at {}: {}",
                    event.path.display(),
                    message
                ));
                0
            }
        }
    }

    /// Consume the watcher stream until it closes.
    pub async fn forward_changes(&self, mut changes: mpsc::Receiver<ChangeEvent>) {
        while let Some(event) = changes.recv().await {
            self.on_change_event(&event);
        }
        tracing::debug!("change stream closed");
    }

    /// Build the push channel router. Any path upgrades to a WebSocket.
    pub fn router(self: Arc<Self>) -> Router {
        Router::new().fallback(handle_upgrade).with_state(self)
    }

    /// Accept push channel connections on `listener` until it fails.
    ///
    /// # Errors
    ///
    /// Returns error if the listener stops with an I/O failure
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        axum::serve(listener, self.router())
            .await
            .map_err(|e| ServeError::Server(format!("Push channel error: {}", e)))
    }
}

async fn handle_upgrade(State(hub): State<Arc<PushHub>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

/// Pump signals to one client until either side goes away.
async fn handle_socket(mut socket: WebSocket, hub: Arc<PushHub>) {
    let (id, mut rx) = hub.register_client();
    tracing::debug!(client = id, "push client connected");

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                let Some(signal) = outbound else { break };
                if socket.send(Message::Text(signal.into())).await.is_err() {
                    break;
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    // Client messages carry no meaning.
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    hub.unregister_client(id);
    tracing::debug!(client = id, "push client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_registration() {
        let hub = PushHub::new();

        let (id1, _rx1) = hub.register_client();
        let (id2, _rx2) = hub.register_client();

        assert_eq!(hub.client_count(), 2);
        assert_ne!(id1, id2);

        hub.unregister_client(id1);
        assert_eq!(hub.client_count(), 1);
    }

    #[test]
    fn test_broadcast_fans_out_to_every_client() {
        let hub = PushHub::new();
        let mut receivers: Vec<_> = (0..3).map(|_| hub.register_client().1).collect();

        assert_eq!(hub.broadcast(REFRESH_SIGNAL), 3);

        for rx in &mut receivers {
            assert_eq!(rx.try_recv().unwrap(), "refresh");
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn test_broadcast_prunes_closed_client() {
        let hub = PushHub::new();
        let (_, mut rx1) = hub.register_client();
        let (_, rx2) = hub.register_client();
        let (_, mut rx3) = hub.register_client();

        drop(rx2);

        assert_eq!(hub.broadcast(REFRESH_SIGNAL), 2);
        assert_eq!(hub.client_count(), 2);
        assert_eq!(rx1.try_recv().unwrap(), "refresh");
        assert_eq!(rx3.try_recv().unwrap(), "refresh");
    }

    #[test]
    fn test_broadcast_with_no_clients() {
        let hub = PushHub::new();
        assert_eq!(hub.broadcast(REFRESH_SIGNAL), 0);
    }

    #[test]
    fn test_full_queue_keeps_client() {
        let hub = PushHub::new();
        let (_, mut rx) = hub.register_client();

        for _ in 0..CLIENT_QUEUE_CAPACITY {
            assert_eq!(hub.broadcast(REFRESH_SIGNAL), 1);
        }
        assert_eq!(hub.broadcast(REFRESH_SIGNAL), 0);
        assert_eq!(hub.client_count(), 1);
        assert_eq!(rx.try_recv().unwrap(), "refresh");
    }

    #[test]
    fn test_error_event_is_not_broadcast() {
        let hub = PushHub::new();
        let (_, mut rx) = hub.register_client();

        let delivered = hub.on_change_event(&ChangeEvent::error("/site", "root removed"));
        assert_eq!(delivered, 0);
        assert!(rx.try_recv().is_err());

        let delivered = hub.on_change_event(&ChangeEvent::modified("/site/index.html"));
        assert_eq!(delivered, 1);
        assert_eq!(rx.try_recv().unwrap(), "refresh");
    }

    #[tokio::test]
    async fn test_forward_changes_until_stream_closes() {
        let hub = PushHub::new();
        let (_, mut rx) = hub.register_client();
        let (tx, changes) = mpsc::channel(8);

        tx.send(ChangeEvent::modified("/site/a.html")).await.unwrap();
        tx.send(ChangeEvent::error("/site", "boom")).await.unwrap();
        tx.send(ChangeEvent::modified("/site/b.html")).await.unwrap();
        drop(tx);

        hub.forward_changes(changes).await;

        assert_eq!(rx.try_recv().unwrap(), "refresh");
        assert_eq!(rx.try_recv().unwrap(), "refresh");
        assert!(rx.try_recv().is_err());
    }
}
