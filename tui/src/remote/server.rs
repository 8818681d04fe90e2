//! Telnet Viewer Listener
//!
//! Serves the dashboard to one telnet client at a time. The accept loop runs
//! in its own task; admitted viewers are handed to the app as
//! [`ViewerSession`]s, anyone else is turned away at the door.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use monitor_core::{Key, TerminalSize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use super::keys::KeyDecoder;
use super::telnet::{negotiation, TelnetEvent, TelnetParser};

const READ_BUFFER_SIZE: usize = 1024;

const BUSY_MESSAGE: &[u8] = b"monitor.io: another viewer is already connected\r\n";

/// Input from the connected viewer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewerInput {
    /// Decoded keypress
    Key(Key),
    /// NAWS report
    Resize(TerminalSize),
    /// Viewer hung up
    Closed,
}

/// The admitted viewer
pub struct ViewerSession {
    peer: SocketAddr,
    output: mpsc::UnboundedSender<Vec<u8>>,
    input: mpsc::UnboundedReceiver<ViewerInput>,
    reader: AbortHandle,
}

impl ViewerSession {
    /// Viewer's address
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Channel for already-encoded output bytes
    pub fn output(&self) -> mpsc::UnboundedSender<Vec<u8>> {
        self.output.clone()
    }

    /// Next input; `None` once the reader is gone
    pub async fn recv(&mut self) -> Option<ViewerInput> {
        self.input.recv().await
    }

    /// Hang up after any queued output has been written
    pub fn close(self) {
        tracing::info!(peer = %self.peer, "Closing viewer session");
        self.reader.abort();
    }
}

/// Frees the single viewer slot when dropped
struct SlotGuard(Arc<AtomicBool>);

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Listener for telnet viewers
pub struct RemoteViewerServer {
    listener: TcpListener,
    local_only: bool,
    occupied: Arc<AtomicBool>,
    sessions: mpsc::UnboundedSender<ViewerSession>,
}

impl RemoteViewerServer {
    /// Bind the viewer port; admitted sessions go to `sessions`
    pub async fn bind(
        addr: SocketAddr,
        local_only: bool,
        sessions: mpsc::UnboundedSender<ViewerSession>,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, local_only, "Listening for telnet viewers");
        Ok(Self {
            listener,
            local_only,
            occupied: Arc::new(AtomicBool::new(false)),
            sessions,
        })
    }

    /// Address actually bound
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept viewers until the listener fails
    pub async fn run(self) -> std::io::Result<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            self.admit(stream, peer).await;
        }
    }

    async fn admit(&self, mut stream: TcpStream, peer: SocketAddr) {
        if self.local_only && !peer.ip().is_loopback() {
            tracing::warn!(%peer, "Rejected non-local viewer");
            return;
        }

        if self
            .occupied
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!(%peer, "Rejected viewer, another one is connected");
            let _ = stream.write_all(BUSY_MESSAGE).await;
            let _ = stream.shutdown().await;
            return;
        }

        let slot = SlotGuard(Arc::clone(&self.occupied));
        let (read_half, write_half) = stream.into_split();
        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let (input_tx, input_rx) = mpsc::unbounded_channel();

        tokio::spawn(write_loop(peer, write_half, output_rx));
        let reader = tokio::spawn(read_loop(peer, read_half, input_tx, slot));

        let session = ViewerSession {
            peer,
            output: output_tx,
            input: input_rx,
            reader: reader.abort_handle(),
        };
        tracing::info!(%peer, "Viewer connected");
        if self.sessions.send(session).is_err() {
            tracing::debug!(%peer, "App gone, dropping viewer");
        }
    }
}

async fn read_loop(
    peer: SocketAddr,
    mut read_half: OwnedReadHalf,
    input: mpsc::UnboundedSender<ViewerInput>,
    _slot: SlotGuard,
) {
    let mut parser = TelnetParser::new();
    let mut decoder = KeyDecoder::new();
    let mut buf = [0u8; READ_BUFFER_SIZE];

    loop {
        let n = match read_half.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(%peer, error = %e, "Viewer read failed");
                break;
            }
        };

        for event in parser.push(&buf[..n]) {
            let inputs = match event {
                TelnetEvent::Data(bytes) => {
                    decoder.push(&bytes).into_iter().map(ViewerInput::Key).collect()
                }
                TelnetEvent::WindowSize { width, height } => {
                    vec![ViewerInput::Resize(TerminalSize::new(width, height))]
                }
            };
            for input_event in inputs {
                if input.send(input_event).is_err() {
                    return;
                }
            }
        }
    }

    tracing::info!(%peer, "Viewer disconnected");
    let _ = input.send(ViewerInput::Closed);
}

async fn write_loop(
    peer: SocketAddr,
    mut write_half: OwnedWriteHalf,
    mut frames: mpsc::UnboundedReceiver<Vec<u8>>,
) {
    if let Err(e) = write_half.write_all(&negotiation()).await {
        tracing::debug!(%peer, error = %e, "Viewer negotiation failed");
        return;
    }
    while let Some(frame) = frames.recv().await {
        if let Err(e) = write_half.write_all(&frame).await {
            tracing::debug!(%peer, error = %e, "Viewer write failed");
            return;
        }
    }
    let _ = write_half.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::telnet::{IAC, OPT_NAWS, SB, SE};
    use std::time::Duration;
    use tokio::time::timeout;

    async fn server(local_only: bool) -> (SocketAddr, mpsc::UnboundedReceiver<ViewerSession>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let server = RemoteViewerServer::bind("127.0.0.1:0".parse().unwrap(), local_only, tx)
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());
        (addr, rx)
    }

    async fn read_some(stream: &mut TcpStream) -> Vec<u8> {
        let mut buf = vec![0u8; 256];
        let n = timeout(Duration::from_secs(2), stream.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        buf.truncate(n);
        buf
    }

    #[tokio::test]
    async fn test_viewer_gets_negotiation_and_sends_keys() {
        let (addr, mut sessions) = server(true).await;
        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut session = timeout(Duration::from_secs(2), sessions.recv())
            .await
            .unwrap()
            .unwrap();

        assert!(read_some(&mut client).await.starts_with(&negotiation()[..3]));

        client
            .write_all(&[IAC, SB, OPT_NAWS, 0, 120, 0, 30, IAC, SE, b'j'])
            .await
            .unwrap();
        assert_eq!(
            session.recv().await,
            Some(ViewerInput::Resize(TerminalSize::new(120, 30)))
        );
        assert_eq!(session.recv().await, Some(ViewerInput::Key(Key::Char('j'))));

        drop(client);
        assert_eq!(session.recv().await, Some(ViewerInput::Closed));
    }

    #[tokio::test]
    async fn test_second_viewer_turned_away() {
        let (addr, mut sessions) = server(false).await;
        let _first = TcpStream::connect(addr).await.unwrap();
        let _session = sessions.recv().await.unwrap();

        let mut second = TcpStream::connect(addr).await.unwrap();
        let mut received = Vec::new();
        timeout(Duration::from_secs(2), second.read_to_end(&mut received))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, BUSY_MESSAGE);
        assert!(sessions.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_slot_frees_after_close() {
        let (addr, mut sessions) = server(false).await;
        let _first = TcpStream::connect(addr).await.unwrap();
        sessions.recv().await.unwrap().close();

        // The aborted reader releases the slot shortly after
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _second = TcpStream::connect(addr).await.unwrap();
        let session = timeout(Duration::from_secs(2), sessions.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(session.peer().ip().is_loopback());
    }
}
