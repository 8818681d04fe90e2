//! Connection Registry
//!
//! Every socket the dashboard knows about, in attach order. Attach order is
//! the canonical list order: row N on screen is `list()[N]`.
//!
//! # Lifecycle
//!
//! ```text
//!   attach ──► connected ──► mark_disconnected ──► (shown as "disconnected...")
//!                 │ ▲                                      │
//!                 └─┘ set_attachment / record_latency      ▼
//!                                       reap_disconnected (second tick after)
//! ```
//!
//! A disconnected record stays for at least one render cycle so the user
//! sees the disconnect before the row disappears.

use std::time::{Duration, Instant};

use crate::attachment::{AttachmentValue, Attachments};
use crate::transport::ConnectionId;

/// One tracked socket
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectionRecord {
    id: ConnectionId,
    remote_address: String,
    attachments: Attachments,
    latency: Option<Duration>,
    disconnected_at: Option<Instant>,
    /// Set by the first reap pass that sees this record disconnected
    reap_armed: bool,
}

impl ConnectionRecord {
    fn new(id: ConnectionId, remote_address: String) -> Self {
        Self {
            id,
            remote_address,
            attachments: Attachments::new(),
            latency: None,
            disconnected_at: None,
            reap_armed: false,
        }
    }

    /// Pool-assigned identifier
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Peer display string
    #[must_use]
    pub fn remote_address(&self) -> &str {
        &self.remote_address
    }

    /// Attached display values
    #[must_use]
    pub fn attachments(&self) -> &Attachments {
        &self.attachments
    }

    /// Most recent round-trip time, once a probe has completed
    #[must_use]
    pub fn latency(&self) -> Option<Duration> {
        self.latency
    }

    /// False once the transport reported the socket gone
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.disconnected_at.is_none()
    }
}

/// Ordered set of connection records with unique IDs
#[derive(Debug, Default)]
pub struct Registry {
    records: Vec<ConnectionRecord>,
}

impl Registry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn find_mut(&mut self, id: ConnectionId) -> Option<&mut ConnectionRecord> {
        self.records.iter_mut().find(|r| r.id == id)
    }

    /// Insert a connected record with no attachments.
    ///
    /// Re-attaching a known ID is a no-op and returns false.
    pub fn attach(&mut self, id: ConnectionId, remote_address: impl Into<String>) -> bool {
        if self.contains(id) {
            tracing::debug!(connection_id = %id, "Ignoring duplicate attach");
            return false;
        }
        self.records.push(ConnectionRecord::new(id, remote_address.into()));
        true
    }

    /// Upsert one attachment. Unknown IDs are ignored.
    pub fn set_attachment(
        &mut self,
        id: ConnectionId,
        name: impl Into<String>,
        value: AttachmentValue,
    ) -> bool {
        match self.find_mut(id) {
            Some(record) => {
                record.attachments.upsert(name, value);
                true
            }
            None => false,
        }
    }

    /// Replace the whole attachment map. Unknown IDs are ignored.
    pub fn replace_attachments(&mut self, id: ConnectionId, attachments: Attachments) -> bool {
        match self.find_mut(id) {
            Some(record) => {
                record.attachments = attachments;
                true
            }
            None => false,
        }
    }

    /// Store a latency measurement. Unknown IDs are ignored.
    pub fn record_latency(&mut self, id: ConnectionId, latency: Duration) -> bool {
        match self.find_mut(id) {
            Some(record) => {
                record.latency = Some(latency);
                true
            }
            None => false,
        }
    }

    /// Flag a record as disconnected without removing it.
    ///
    /// Returns false for unknown or already-disconnected IDs.
    pub fn mark_disconnected(&mut self, id: ConnectionId, now: Instant) -> bool {
        match self.find_mut(id) {
            Some(record) if record.is_connected() => {
                record.disconnected_at = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Remove disconnected records whose grace period has elapsed.
    ///
    /// A record is only removed by a pass after the one that first saw it
    /// disconnected, so the tick in between renders it. With a zero grace
    /// that is the next pass. Returns whether anything was removed.
    pub fn reap_disconnected(&mut self, now: Instant, grace: Duration) -> bool {
        let before = self.records.len();
        self.records.retain_mut(|r| match r.disconnected_at {
            Some(_) if !r.reap_armed => {
                r.reap_armed = true;
                true
            }
            Some(at) => now.saturating_duration_since(at) < grace,
            None => true,
        });
        let reaped = before - self.records.len();
        if reaped > 0 {
            tracing::debug!(reaped, remaining = self.records.len(), "Reaped disconnected sockets");
        }
        reaped > 0
    }

    /// All records, connected or awaiting reap, in attach order
    #[must_use]
    pub fn list(&self) -> &[ConnectionRecord] {
        &self.records
    }

    /// Record at a list position
    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<&ConnectionRecord> {
        self.records.get(index)
    }

    /// Record by ID
    #[must_use]
    pub fn get(&self, id: ConnectionId) -> Option<&ConnectionRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Whether an ID is present
    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.get(id).is_some()
    }

    /// Authoritative connection count for viewport math
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Widest attachment map across all records (horizontal scroll bound)
    #[must_use]
    pub fn max_attachment_count(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.attachments.len())
            .max()
            .unwrap_or(0)
    }
}
