//! In-Process Socket Pool
//!
//! Channel-backed pool for embedding the dashboard next to an application
//! that already owns its connections, and for driving the dashboard in tests
//! without opening sockets.
//!
//! # Usage
//!
//! ```ignore
//! let (pool, mut events) = InProcessPool::new();
//! let mut peer = pool.attach("10.0.0.7:41000");
//!
//! peer.send("monitor", json!({"user": "bob"}))?;
//! // events now yields Attached { .. } then Inbound { .. }
//!
//! pool.emit(peer.id(), "ping", &json!({"x": 1}))?;
//! assert_eq!(peer.try_recv(), Some(WireMessage::event("ping", json!({"x": 1}))));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::messages::WireMessage;

use super::traits::{ConnectionId, SocketPool, TransportError, TransportEvent};

type PeerMap = HashMap<ConnectionId, mpsc::UnboundedSender<WireMessage>>;

/// Socket pool whose "sockets" are channel pairs
#[derive(Clone)]
pub struct InProcessPool {
    peers: Arc<Mutex<PeerMap>>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl InProcessPool {
    /// Create a pool and the receiver its lifecycle events arrive on
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let pool = Self {
            peers: Arc::new(Mutex::new(HashMap::new())),
            events,
        };
        (pool, events_rx)
    }

    /// Attach a new simulated socket
    pub fn attach(&self, remote_address: impl Into<String>) -> InProcessPeer {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::unbounded_channel();

        self.peers.lock().insert(id, tx);
        let _ = self.events.send(TransportEvent::Attached {
            id,
            remote_address: remote_address.into(),
        });
        tracing::debug!(connection_id = %id, "In-process socket attached");

        InProcessPeer {
            id,
            rx,
            peers: Arc::clone(&self.peers),
            events: self.events.clone(),
        }
    }

    fn detach(
        peers: &Mutex<PeerMap>,
        events: &mpsc::UnboundedSender<TransportEvent>,
        id: ConnectionId,
    ) -> bool {
        if peers.lock().remove(&id).is_some() {
            let _ = events.send(TransportEvent::Detached { id });
            true
        } else {
            false
        }
    }
}

impl SocketPool for InProcessPool {
    fn emit(&self, id: ConnectionId, name: &str, data: &Value) -> Result<(), TransportError> {
        let peers = self.peers.lock();
        let tx = peers.get(&id).ok_or(TransportError::UnknownConnection(id))?;
        tx.send(WireMessage::event(name, data.clone()))
            .map_err(|_| TransportError::ConnectionClosed)
    }

    fn disconnect(&self, id: ConnectionId) -> Result<(), TransportError> {
        if Self::detach(&self.peers, &self.events, id) {
            tracing::debug!(connection_id = %id, "In-process socket disconnected");
            Ok(())
        } else {
            Err(TransportError::UnknownConnection(id))
        }
    }

    fn connection_count(&self) -> usize {
        self.peers.lock().len()
    }
}

/// The remote end of a simulated socket
pub struct InProcessPeer {
    id: ConnectionId,
    rx: mpsc::UnboundedReceiver<WireMessage>,
    peers: Arc<Mutex<PeerMap>>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl InProcessPeer {
    /// Pool-assigned identifier
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Whether the pool still considers this socket attached
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.peers.lock().contains_key(&self.id)
    }

    /// Send a named event to the dashboard
    pub fn send(&self, name: &str, data: Value) -> Result<(), TransportError> {
        if !self.is_attached() {
            return Err(TransportError::ConnectionClosed);
        }
        self.events
            .send(TransportEvent::Inbound {
                id: self.id,
                name: name.to_string(),
                data,
            })
            .map_err(|_| TransportError::SendFailed("event receiver dropped".to_string()))
    }

    /// Next message emitted to this socket, if one is queued
    pub fn try_recv(&mut self) -> Option<WireMessage> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next message emitted to this socket
    ///
    /// Returns `None` once the pool disconnected the socket and the queue
    /// is drained.
    pub async fn recv(&mut self) -> Option<WireMessage> {
        self.rx.recv().await
    }

    /// Close from the peer side
    pub fn close(self) {
        InProcessPool::detach(&self.peers, &self.events, self.id);
    }
}
