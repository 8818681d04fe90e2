//! monitor.io TUI - Terminal front end for monitor-core
//!
//! Draws the socket dashboard on the local terminal, or serves it over
//! telnet to one remote viewer.
//!
//! # Architecture
//!
//! - **Surface**: ANSI output over stdout or a telnet socket
//! - **Render**: Dirty-region painting of the dashboard
//! - **Remote**: Telnet negotiation, key decoding, the viewer listener
//! - **App**: The event loop feeding the dashboard and carrying out its effects

pub mod app;
pub mod keys;
pub mod remote;
pub mod render;
pub mod surface;
pub mod theme;

pub use app::App;
