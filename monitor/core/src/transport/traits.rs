//! Transport Abstractions
//!
//! The dashboard never talks to sockets directly. It consumes a stream of
//! [`TransportEvent`]s and issues fire-and-forget commands through a
//! [`SocketPool`]. Concrete pools live next to this module (TCP and
//! in-process).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Unique identifier for a monitored socket
///
/// Assigned by the pool when a socket attaches and stable until it detaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocate a new process-unique connection ID
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Build an ID from a raw value (tests and replay only)
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw numeric value
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sock-{}", self.0)
    }
}

/// Lifecycle and traffic notifications delivered by a socket pool
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A socket connected
    Attached {
        /// Pool-assigned identifier
        id: ConnectionId,
        /// Display string for the peer (usually `ip:port`)
        remote_address: String,
    },
    /// A socket went away (peer closed, IO error, or local disconnect)
    Detached {
        /// Identifier of the departed socket
        id: ConnectionId,
    },
    /// A named event arrived from a socket
    Inbound {
        /// Sender
        id: ConnectionId,
        /// Event name
        name: String,
        /// Event payload
        data: Value,
    },
}

impl TransportEvent {
    /// The connection this event concerns
    #[must_use]
    pub fn connection_id(&self) -> ConnectionId {
        match self {
            Self::Attached { id, .. } | Self::Detached { id } | Self::Inbound { id, .. } => *id,
        }
    }
}

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection was closed
    #[error("connection closed")]
    ConnectionClosed,

    /// No socket with this ID is attached
    #[error("unknown connection: {0}")]
    UnknownConnection(ConnectionId),

    /// Failed to queue a message for a socket
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Failed to serialize or deserialize a message
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Frame checksum verification failed
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Checksum carried in the frame header
        expected: u32,
        /// Checksum computed over the received payload
        actual: u32,
    },

    /// Frame length exceeds the protocol maximum
    #[error("frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Declared or encoded size
        size: usize,
        /// Protocol maximum
        max: usize,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Commands the dashboard issues to the pool of monitored sockets
///
/// All methods are fire-and-forget: success means the command was queued,
/// not that the peer received it.
pub trait SocketPool: Send + Sync {
    /// Queue a named event for one socket
    fn emit(&self, id: ConnectionId, name: &str, data: &Value) -> Result<(), TransportError>;

    /// Close one socket; the pool reports [`TransportEvent::Detached`] for it
    fn disconnect(&self, id: ConnectionId) -> Result<(), TransportError>;

    /// Number of sockets currently attached to the pool
    fn connection_count(&self) -> usize;
}
