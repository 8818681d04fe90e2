//! Local terminal setup and teardown

use std::io::{self, Write};
use std::panic;

use crossterm::{
    cursor::{Hide, Show},
    execute,
    style::{Attribute, SetAttribute},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use monitor_core::TerminalSize;

/// Raw mode for as long as this lives
///
/// Dropping it (normal exit, early `?` return or unwind) restores cooked
/// mode and the cursor.
pub struct TerminalGuard {
    _private: (),
}

impl TerminalGuard {
    /// Enter raw mode and hide the cursor
    pub fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let guard = Self { _private: () };
        execute!(io::stdout(), Hide)?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), SetAttribute(Attribute::Reset), Show);
    }
}

/// Restore the terminal before the default panic report prints
pub fn install_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, SetAttribute(Attribute::Reset), Show);
        let _ = stdout.write_all(b"\r\n");
        original_hook(panic_info);
    }));
}

/// Size of the controlling terminal, or `fallback` when there is none
#[must_use]
pub fn local_size(fallback: TerminalSize) -> TerminalSize {
    match crossterm::terminal::size() {
        Ok((width, height)) if width > 0 && height > 0 => TerminalSize::new(width, height),
        _ => fallback,
    }
}
