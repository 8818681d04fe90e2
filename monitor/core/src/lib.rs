//! Monitor Core - Headless Socket Dashboard for monitor-io
//!
//! This crate holds everything the dashboard knows and decides, independent
//! of where it is drawn. The `monitor-tui` crate drives it from the local
//! terminal or from a remote telnet viewer.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Terminal Surfaces                          │
//! │     ┌──────────────────────┐        ┌──────────────────────┐     │
//! │     │  Local (crossterm)   │        │  Remote (telnet)     │     │
//! │     └──────────┬───────────┘        └──────────┬───────────┘     │
//! │                └───────────────┬───────────────┘                 │
//! │                     Key (up) / DirtyRegions (down)               │
//! └────────────────────────────────┼─────────────────────────────────┘
//!                                  │
//! ┌────────────────────────────────┼─────────────────────────────────┐
//! │                          MONITOR CORE                             │
//! │  ┌─────────────────────────────┴──────────────────────────────┐  │
//! │  │                        Dashboard                            │  │
//! │  │  ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌─────────────┐ │  │
//! │  │  │ Registry │  │ Viewport │  │   Emit   │  │   Latency   │ │  │
//! │  │  │          │  │          │  │  Wizard  │  │   Prober    │ │  │
//! │  │  └──────────┘  └──────────┘  └──────────┘  └─────────────┘ │  │
//! │  └─────────────────────────────┬──────────────────────────────┘  │
//! │                  TransportEvent (up) / Effect (down)              │
//! │  ┌─────────────────────────────┴──────────────────────────────┐  │
//! │  │        Socket pools: TCP (framed JSON) / in-process         │  │
//! │  └─────────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Dashboard`]: Context object; turns events into state changes and effects
//! - [`Registry`]: Connection records in attach order
//! - [`Viewport`]: Scroll offsets and selection
//! - [`EmitMachine`]: The three-prompt emit wizard
//! - [`SocketPool`]: Commands to monitored sockets
//!
//! # Quick Start
//!
//! ```ignore
//! use monitor_core::{Dashboard, DashboardConfig, DashboardEvent, Effect, InProcessPool, SocketPool, TerminalSize};
//!
//! let (pool, mut events) = InProcessPool::new();
//! let mut dashboard = Dashboard::new(DashboardConfig::default(), TerminalSize::new(100, 40));
//!
//! while let Some(event) = events.recv().await {
//!     for effect in dashboard.handle(DashboardEvent::Transport(event)) {
//!         if let Effect::Send { id, name, data } = effect {
//!             pool.emit(id, &name, &data)?;
//!         }
//!     }
//!     // repaint whatever dashboard.dirty() flags
//! }
//! ```
//!
//! # No Terminal Dependencies
//!
//! This crate has **zero** dependencies on crossterm or any other terminal
//! library. Rendering lives in `monitor-tui`.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod attachment;
pub mod config;
pub mod dashboard;
pub mod dirty;
pub mod emit;
pub mod input;
pub mod latency;
pub mod messages;
pub mod registry;
pub mod transport;
pub mod viewport;

// Re-exports for convenience
pub use attachment::{AttachmentValue, Attachments};
pub use dashboard::{Dashboard, DashboardConfig, DashboardEvent, Effect, TerminalSize};
pub use dirty::{DirtyRegions, Region};
pub use emit::{EmitMachine, EmitNotice, EmitStage, EmitTarget};
pub use input::Key;
pub use latency::{LatencyBand, ProbeConfig};
pub use messages::{WireMessage, ATTACH_EVENT, ATTACH_REPLACE_EVENT, ECHO_EVENT};
pub use registry::{ConnectionRecord, Registry};
pub use viewport::{NegativeScrollPolicy, Viewport, ViewportError};

// Transport exports
pub use transport::{
    ConnectionId, InProcessPeer, InProcessPool, SocketPool, TcpSocketPool, TcpSocketServer,
    TransportError, TransportEvent,
};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, MonitorConfig,
    MonitorToml,
};
