//! TCP Socket Pool
//!
//! Accepts monitored sockets over TCP. Each connection gets a read task
//! (frames in, [`TransportEvent::Inbound`] out) and a write task (outbound
//! frames, then close). The [`TcpSocketPool`] handle is what the dashboard
//! uses to emit and disconnect.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::messages::WireMessage;

use super::frame::{encode, FrameDecoder};
use super::traits::{ConnectionId, SocketPool, TransportError, TransportEvent};

const READ_BUFFER_SIZE: usize = 4096;

enum Outbound {
    Frame(Vec<u8>),
    Close,
}

/// Handle to a single accepted socket
struct ConnectionHandle {
    tx: mpsc::UnboundedSender<Outbound>,
    reader: AbortHandle,
}

struct PoolShared {
    connections: RwLock<HashMap<ConnectionId, ConnectionHandle>>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl PoolShared {
    /// Remove a connection and report it. Only the caller that actually
    /// removed the handle reports, so `Detached` is sent exactly once.
    fn remove(&self, id: ConnectionId) -> Option<ConnectionHandle> {
        let handle = self.connections.write().remove(&id)?;
        let _ = self.events.send(TransportEvent::Detached { id });
        Some(handle)
    }
}

/// Cloneable command handle for sockets accepted by a [`TcpSocketServer`]
#[derive(Clone)]
pub struct TcpSocketPool {
    shared: Arc<PoolShared>,
}

impl SocketPool for TcpSocketPool {
    fn emit(&self, id: ConnectionId, name: &str, data: &Value) -> Result<(), TransportError> {
        let frame = encode(&WireMessage::event(name, data.clone()))?;
        let connections = self.shared.connections.read();
        let handle = connections
            .get(&id)
            .ok_or(TransportError::UnknownConnection(id))?;
        handle
            .tx
            .send(Outbound::Frame(frame))
            .map_err(|_| TransportError::SendFailed("writer task ended".to_string()))
    }

    fn disconnect(&self, id: ConnectionId) -> Result<(), TransportError> {
        let handle = self
            .shared
            .remove(id)
            .ok_or(TransportError::UnknownConnection(id))?;
        handle.reader.abort();
        let _ = handle.tx.send(Outbound::Close);
        tracing::info!(connection_id = %id, "Socket disconnected by dashboard");
        Ok(())
    }

    fn connection_count(&self) -> usize {
        self.shared.connections.read().len()
    }
}

/// Listener for monitored sockets
pub struct TcpSocketServer {
    listener: TcpListener,
    pool: TcpSocketPool,
}

impl TcpSocketServer {
    /// Bind the listener; lifecycle events go to `events`
    pub async fn bind(
        addr: SocketAddr,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "Listening for monitored sockets");

        Ok(Self {
            listener,
            pool: TcpSocketPool {
                shared: Arc::new(PoolShared {
                    connections: RwLock::new(HashMap::new()),
                    events,
                }),
            },
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    /// Command handle for accepted sockets
    #[must_use]
    pub fn pool(&self) -> TcpSocketPool {
        self.pool.clone()
    }

    /// Accept sockets until the listener fails
    pub async fn run(self) -> Result<(), TransportError> {
        loop {
            self.accept_one().await?;
        }
    }

    /// Accept a single socket and start its tasks
    pub async fn accept_one(&self) -> Result<ConnectionId, TransportError> {
        let (stream, peer) = self.listener.accept().await?;
        Ok(self.register(stream, peer))
    }

    fn register(&self, stream: TcpStream, peer: SocketAddr) -> ConnectionId {
        let id = ConnectionId::new();
        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = &self.pool.shared;

        // Hold the map lock until the handle is stored so a reader that
        // finishes immediately still finds (and reports) its own entry.
        let mut connections = shared.connections.write();
        let _ = shared.events.send(TransportEvent::Attached {
            id,
            remote_address: peer.to_string(),
        });
        let reader = tokio::spawn(read_loop(id, read_half, Arc::clone(shared)));
        tokio::spawn(write_loop(id, write_half, rx));
        connections.insert(
            id,
            ConnectionHandle {
                tx,
                reader: reader.abort_handle(),
            },
        );
        drop(connections);

        tracing::info!(connection_id = %id, peer = %peer, "Socket attached");
        id
    }
}

async fn read_loop(id: ConnectionId, mut read_half: OwnedReadHalf, shared: Arc<PoolShared>) {
    let mut decoder = FrameDecoder::new();
    let mut buf = [0u8; READ_BUFFER_SIZE];

    'read: loop {
        match read_half.read(&mut buf).await {
            Ok(0) => {
                tracing::debug!(connection_id = %id, "Socket closed by peer");
                break;
            }
            Ok(n) => {
                decoder.push(&buf[..n]);
                loop {
                    match decoder.next_message() {
                        Ok(Some(WireMessage::Event { name, data })) => {
                            let event = TransportEvent::Inbound { id, name, data };
                            if shared.events.send(event).is_err() {
                                tracing::debug!(connection_id = %id, "Event receiver dropped");
                                break 'read;
                            }
                        }
                        Ok(None) => break,
                        Err(e) if decoder.is_poisoned() => {
                            tracing::warn!(connection_id = %id, error = %e, "Unrecoverable frame, dropping socket");
                            break 'read;
                        }
                        Err(e) => {
                            tracing::warn!(connection_id = %id, error = %e, "Skipping bad frame");
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(connection_id = %id, error = %e, "Read error");
                break;
            }
        }
    }

    if let Some(handle) = shared.remove(id) {
        let _ = handle.tx.send(Outbound::Close);
        tracing::info!(connection_id = %id, "Socket detached");
    }
}

async fn write_loop(
    id: ConnectionId,
    mut write_half: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
) {
    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Frame(frame) => {
                if let Err(e) = write_half.write_all(&frame).await {
                    tracing::warn!(connection_id = %id, error = %e, "Write error");
                    break;
                }
            }
            Outbound::Close => break,
        }
    }
    let _ = write_half.shutdown().await;
}
