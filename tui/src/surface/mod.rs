//! Terminal Surfaces
//!
//! The renderer only ever talks to a [`Surface`]: move the cursor, set a
//! style, print, clear. [`AnsiSurface`] turns those calls into ANSI escape
//! sequences over any writer, which covers both the local terminal (stdout)
//! and a remote viewer (a telnet socket behind [`RemoteSink`]).

mod local;
mod remote;

use std::io::{self, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use monitor_core::TerminalSize;

pub use local::{install_panic_hook, local_size, TerminalGuard};
pub use remote::RemoteSink;

/// Text attributes for the next `print`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Style {
    /// Bold weight
    pub bold: bool,
    /// Foreground color; `None` keeps the terminal default
    pub fg: Option<Color>,
}

impl Style {
    /// Terminal defaults
    pub const PLAIN: Style = Style {
        bold: false,
        fg: None,
    };

    /// Bold, default color
    pub const BOLD: Style = Style {
        bold: true,
        fg: None,
    };

    /// Default weight in `color`
    #[must_use]
    pub const fn fg(color: Color) -> Self {
        Self {
            bold: false,
            fg: Some(color),
        }
    }

    /// Same style, bold
    #[must_use]
    pub const fn bold(self) -> Self {
        Self { bold: true, ..self }
    }
}

/// A character grid the dashboard draws onto
pub trait Surface {
    /// Current size in cells
    fn size(&self) -> TerminalSize;

    /// Record a new size (resize or NAWS report)
    fn set_size(&mut self, size: TerminalSize);

    /// Cursor to `column`, `row` (zero-based)
    fn move_to(&mut self, column: u16, row: u16) -> io::Result<()>;

    /// Print at the cursor in the current style
    fn print(&mut self, text: &str) -> io::Result<()>;

    /// Switch style for following prints
    fn set_style(&mut self, style: Style) -> io::Result<()>;

    /// Back to terminal defaults
    fn reset_style(&mut self) -> io::Result<()>;

    /// Erase the cursor's row
    fn clear_line(&mut self) -> io::Result<()>;

    /// Show the text cursor
    fn show_cursor(&mut self) -> io::Result<()>;

    /// Hide the text cursor
    fn hide_cursor(&mut self) -> io::Result<()>;

    /// Push queued output to the terminal
    fn flush(&mut self) -> io::Result<()>;

    /// Erase every row from `row` to the bottom
    fn clear_from(&mut self, row: u16) -> io::Result<()> {
        for y in row..self.size().height {
            self.move_to(0, y)?;
            self.clear_line()?;
        }
        Ok(())
    }

    /// Print `text` in `style`, then reset
    fn print_styled(&mut self, text: &str, style: Style) -> io::Result<()> {
        self.set_style(style)?;
        self.print(text)?;
        self.reset_style()
    }

    /// Blank the screen before the first frame
    fn prepare(&mut self) -> io::Result<()> {
        self.reset_style()?;
        self.clear_from(0)?;
        self.hide_cursor()?;
        self.move_to(0, 0)?;
        self.flush()
    }

    /// Leave the terminal usable: cursor visible, below the dashboard
    fn restore(&mut self) -> io::Result<()> {
        self.reset_style()?;
        self.show_cursor()?;
        self.move_to(0, self.size().height.saturating_sub(1))?;
        self.print("\r\n")?;
        self.flush()
    }
}

/// ANSI escape sequence surface over any writer
pub struct AnsiSurface<W: Write> {
    out: W,
    size: TerminalSize,
}

impl<W: Write> AnsiSurface<W> {
    /// Wrap `out`, assuming a terminal of `size`
    pub fn new(out: W, size: TerminalSize) -> Self {
        Self { out, size }
    }

    /// Underlying writer
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Unwrap the writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Surface for AnsiSurface<W> {
    fn size(&self) -> TerminalSize {
        self.size
    }

    fn set_size(&mut self, size: TerminalSize) {
        self.size = size;
    }

    fn move_to(&mut self, column: u16, row: u16) -> io::Result<()> {
        queue!(self.out, MoveTo(column, row))
    }

    fn print(&mut self, text: &str) -> io::Result<()> {
        queue!(self.out, Print(text))
    }

    fn set_style(&mut self, style: Style) -> io::Result<()> {
        if style.bold {
            queue!(self.out, SetAttribute(Attribute::Bold))?;
        }
        if let Some(color) = style.fg {
            queue!(self.out, SetForegroundColor(color))?;
        }
        Ok(())
    }

    fn reset_style(&mut self) -> io::Result<()> {
        queue!(self.out, SetAttribute(Attribute::Reset), ResetColor)
    }

    fn clear_line(&mut self) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::CurrentLine))
    }

    fn show_cursor(&mut self) -> io::Result<()> {
        queue!(self.out, Show)
    }

    fn hide_cursor(&mut self) -> io::Result<()> {
        queue!(self.out, Hide)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface() -> AnsiSurface<Vec<u8>> {
        AnsiSurface::new(Vec::new(), TerminalSize::new(20, 4))
    }

    fn output(surface: &AnsiSurface<Vec<u8>>) -> String {
        String::from_utf8_lossy(surface.get_ref()).into_owned()
    }

    #[test]
    fn test_move_uses_one_based_ansi() {
        let mut s = surface();
        s.move_to(0, 4).unwrap();
        assert_eq!(output(&s), "\x1b[5;1H");
    }

    #[test]
    fn test_styled_print_resets() {
        let mut s = surface();
        s.print_styled("hi", Style::BOLD).unwrap();
        let out = output(&s);
        assert!(out.starts_with("\x1b[1m"));
        assert!(out.contains("hi"));
        assert!(out.find("\x1b[0m") > out.find("hi"));
    }

    #[test]
    fn test_clear_from_covers_rows_to_bottom() {
        let mut s = surface();
        s.clear_from(2).unwrap();
        let out = output(&s);
        assert!(out.contains("\x1b[3;1H"));
        assert!(out.contains("\x1b[4;1H"));
        assert!(!out.contains("\x1b[2;1H"));
        assert_eq!(out.matches("\x1b[2K").count(), 2);
    }

    #[test]
    fn test_restore_shows_cursor() {
        let mut s = surface();
        s.restore().unwrap();
        let out = output(&s);
        assert!(out.contains("\x1b[?25h"));
        assert!(out.ends_with("\r\n"));
    }
}
