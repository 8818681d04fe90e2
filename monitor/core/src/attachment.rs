//! Attachment Values
//!
//! Monitored sockets can attach named values to themselves for display.
//! Only strings and numbers are displayable; everything else is rejected
//! when it crosses the wire boundary so the rest of the dashboard never has
//! to inspect JSON types.

use std::fmt;

use serde_json::{Map, Number, Value};

/// A displayable attachment value
#[derive(Clone, Debug, PartialEq)]
pub enum AttachmentValue {
    /// Rendered bare: `score: 42`
    Number(Number),
    /// Rendered quoted: `user: "bob"`
    Text(String),
}

impl AttachmentValue {
    /// Convert a JSON value, rejecting anything that is not a string or number
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for AttachmentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<&str> for AttachmentValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for AttachmentValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for AttachmentValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<u64> for AttachmentValue {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

/// Insertion-ordered attachment map with unique names
///
/// Updating an existing name keeps its original position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attachments {
    entries: Vec<(String, AttachmentValue)>,
}

impl Attachments {
    /// Empty map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update one value
    pub fn upsert(&mut self, name: impl Into<String>, value: AttachmentValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Look up a value by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttachmentValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Number of attachments
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no attachments
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttachmentValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Build from a JSON object, keeping displayable members in order.
    ///
    /// Returns the map and the names that were skipped.
    #[must_use]
    pub fn from_json_object(object: &Map<String, Value>) -> (Self, Vec<String>) {
        let mut attachments = Self::new();
        let mut skipped = Vec::new();
        for (name, value) in object {
            match AttachmentValue::from_json(value) {
                Some(v) => attachments.upsert(name.clone(), v),
                None => skipped.push(name.clone()),
            }
        }
        (attachments, skipped)
    }
}
