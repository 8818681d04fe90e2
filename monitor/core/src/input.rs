//! Decoded Keys
//!
//! Terminal backends (crossterm locally, the telnet decoder remotely)
//! translate their input into these before anything reaches the dashboard.

/// A decoded keypress
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// Printable character
    Char(char),
    /// Return / Enter
    Enter,
    /// Backspace or DEL
    Backspace,
    /// Escape
    Esc,
    /// Arrow up (same as `k`)
    Up,
    /// Arrow down (same as `j`)
    Down,
    /// Arrow left (same as `h`)
    Left,
    /// Arrow right (same as `l`)
    Right,
    /// Page Up
    PageUp,
    /// Page Down
    PageDown,
    /// Control chord, lowercase letter (`Ctrl('c')`)
    Ctrl(char),
}

/// List navigation a key maps to when no prompt is open
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Navigation {
    /// Selection up one row
    Up,
    /// Selection down one row
    Down,
    /// Attachment columns left
    Left,
    /// Attachment columns right
    Right,
    /// Selection up one screen of rows
    PageUp,
    /// Selection down one screen of rows
    PageDown,
}

impl Key {
    /// Interrupt chord
    pub const INTERRUPT: Key = Key::Ctrl('c');

    /// Navigation meaning of this key (arrows, `hjkl` and paging)
    #[must_use]
    pub fn navigation(self) -> Option<Navigation> {
        match self {
            Key::Up | Key::Char('k') => Some(Navigation::Up),
            Key::Down | Key::Char('j') => Some(Navigation::Down),
            Key::Left | Key::Char('h') => Some(Navigation::Left),
            Key::Right | Key::Char('l') => Some(Navigation::Right),
            Key::PageUp => Some(Navigation::PageUp),
            Key::PageDown => Some(Navigation::PageDown),
            _ => None,
        }
    }
}
