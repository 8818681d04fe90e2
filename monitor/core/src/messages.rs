//! Wire Messages
//!
//! What travels between the dashboard and a monitored socket. Both
//! directions use the same shape: a named event with a JSON payload.
//!
//! ```text
//! {"type":"event","name":"monitor","data":{"user":"bob","score":42}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event name for latency probes and their replies
pub const ECHO_EVENT: &str = "_echo";

/// Event name for attachment upserts sent by a monitored socket
pub const ATTACH_EVENT: &str = "monitor";

/// Event name for wholesale attachment replacement
pub const ATTACH_REPLACE_EVENT: &str = "monitor:replace";

/// A frame payload exchanged with a monitored socket
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    /// A named event
    Event {
        /// Event name
        name: String,
        /// Event payload (any JSON value)
        #[serde(default)]
        data: Value,
    },
}

impl WireMessage {
    /// Build an event message
    pub fn event(name: impl Into<String>, data: Value) -> Self {
        Self::Event {
            name: name.into(),
            data,
        }
    }
}
