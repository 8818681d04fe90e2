//! Transport Layer for Monitored Sockets
//!
//! Separates how sockets are carried from what the dashboard does with them:
//! - `Tcp`: real sockets speaking the framed JSON protocol
//! - `InProcess`: channel pairs for embedding and tests
//!
//! Both deliver [`TransportEvent`]s on an unbounded channel and accept
//! commands through the [`SocketPool`] trait.

pub mod frame;
pub mod in_process;
pub mod tcp;
pub mod traits;

pub use frame::{encode, FrameDecoder, MAX_FRAME_SIZE};
pub use in_process::{InProcessPeer, InProcessPool};
pub use tcp::{TcpSocketPool, TcpSocketServer};
pub use traits::{ConnectionId, SocketPool, TransportError, TransportEvent};
