//! Writer that ships frames to a telnet viewer

use std::io::{self, Write};

use tokio::sync::mpsc::UnboundedSender;

use crate::remote::telnet::escape_output;

/// Buffers a frame and hands it to the viewer's writer task on flush
///
/// IAC bytes in the output are doubled on the way out.
pub struct RemoteSink {
    buffer: Vec<u8>,
    tx: UnboundedSender<Vec<u8>>,
}

impl RemoteSink {
    /// Sink feeding `tx`
    pub fn new(tx: UnboundedSender<Vec<u8>>) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            tx,
        }
    }

    /// Whether the viewer's writer task is gone
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Write for RemoteSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let frame = escape_output(&self.buffer);
        self.buffer.clear();
        self.tx
            .send(frame)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "viewer disconnected"))
    }
}
