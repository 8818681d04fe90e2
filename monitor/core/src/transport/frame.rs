//! Frame Protocol
//!
//! Wire format between the dashboard and monitored sockets: length-prefixed
//! JSON with a CRC32 checksum.
//!
//! # Frame Format
//!
//! ```text
//! +----------------+----------------+------------------------------------------+
//! | Length (4)     | Checksum (4)   | JSON Payload (variable)                  |
//! | big-endian u32 | CRC32          | WireMessage                              |
//! +----------------+----------------+------------------------------------------+
//! ```
//!
//! A frame whose header is intact but whose payload is corrupt (bad checksum
//! or bad JSON) is skipped so the stream stays usable. A header announcing
//! more than [`MAX_FRAME_SIZE`] bytes cannot be resynchronized and poisons
//! the decoder.

use crate::messages::WireMessage;

use super::TransportError;

/// Maximum payload size (1 MiB)
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Frame header size: 4 bytes length + 4 bytes checksum
pub const HEADER_SIZE: usize = 8;

const MIN_BUFFER_CAPACITY: usize = 4096;

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Encode a message into a complete frame
///
/// # Errors
///
/// Returns `SerializationError` if JSON encoding fails, or `FrameTooLarge`
/// if the payload exceeds [`MAX_FRAME_SIZE`].
pub fn encode(msg: &WireMessage) -> Result<Vec<u8>, TransportError> {
    let json =
        serde_json::to_vec(msg).map_err(|e| TransportError::SerializationError(e.to_string()))?;

    if json.len() > MAX_FRAME_SIZE {
        return Err(TransportError::FrameTooLarge {
            size: json.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    // Bounded by MAX_FRAME_SIZE above
    #[allow(clippy::cast_possible_truncation)]
    let len = json.len() as u32;

    let mut buf = Vec::with_capacity(HEADER_SIZE + json.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&crc32fast::hash(&json).to_be_bytes());
    buf.extend_from_slice(&json);
    Ok(buf)
}

/// Streaming decoder for inbound frames
///
/// Push bytes as they arrive, then call [`FrameDecoder::next_message`] until
/// it yields `Ok(None)`.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    /// Position consumed up to
    read_pos: usize,
    poisoned: bool,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create an empty decoder
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MIN_BUFFER_CAPACITY),
            read_pos: 0,
            poisoned: false,
        }
    }

    /// Append received bytes
    pub fn push(&mut self, data: &[u8]) {
        if self.read_pos > self.buffer.len() / 2 && self.read_pos > MIN_BUFFER_CAPACITY {
            self.buffer.drain(..self.read_pos);
            self.read_pos = 0;
        }
        self.buffer.extend_from_slice(data);
    }

    /// Bytes buffered but not yet consumed
    #[must_use]
    pub fn available(&self) -> usize {
        self.buffer.len() - self.read_pos
    }

    /// Whether an oversized header made the stream unrecoverable
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Decode the next complete frame
    ///
    /// - `Ok(Some(msg))`: one frame consumed
    /// - `Ok(None)`: need more bytes
    /// - `Err(ChecksumMismatch | SerializationError)`: the bad frame was
    ///   skipped, keep calling
    /// - `Err(FrameTooLarge)`: the decoder is poisoned, drop the connection
    pub fn next_message(&mut self) -> Result<Option<WireMessage>, TransportError> {
        let available = self.available();
        if available < HEADER_SIZE {
            return Ok(None);
        }

        let header = &self.buffer[self.read_pos..self.read_pos + HEADER_SIZE];
        let len = read_u32(&header[..4]) as usize;
        let expected = read_u32(&header[4..]);

        if len > MAX_FRAME_SIZE {
            self.poisoned = true;
            return Err(TransportError::FrameTooLarge {
                size: len,
                max: MAX_FRAME_SIZE,
            });
        }

        if available < HEADER_SIZE + len {
            return Ok(None);
        }

        let start = self.read_pos + HEADER_SIZE;
        let end = start + len;
        self.read_pos = end;
        let payload = &self.buffer[start..end];

        let actual = crc32fast::hash(payload);
        if actual != expected {
            return Err(TransportError::ChecksumMismatch { expected, actual });
        }

        serde_json::from_slice(payload)
            .map(Some)
            .map_err(|e| TransportError::SerializationError(e.to_string()))
    }

    /// Drop everything buffered
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.read_pos = 0;
        self.poisoned = false;
    }
}
