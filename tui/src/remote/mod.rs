//! Remote Mode
//!
//! The dashboard served over telnet to a single viewer.

mod keys;
mod server;
pub mod telnet;

pub use keys::KeyDecoder;
pub use server::{RemoteViewerServer, ViewerInput, ViewerSession};
