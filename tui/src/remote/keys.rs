//! Raw Byte Key Decoding
//!
//! A telnet client in character mode sends keystrokes as raw bytes: control
//! codes, ANSI escape sequences for arrows and UTF-8 for everything printable.

use monitor_core::Key;

const ESC: u8 = 0x1b;
const CR: u8 = b'\r';
const LF: u8 = b'\n';
const BS: u8 = 0x08;
const DEL: u8 = 0x7f;

/// Stateful decoder; incomplete sequences wait for the next read
#[derive(Debug, Default)]
pub struct KeyDecoder {
    pending: Vec<u8>,
    /// Last byte was CR, so a trailing NUL or LF belongs to it
    after_cr: bool,
}

impl KeyDecoder {
    /// Empty decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as many keys as the buffered bytes allow
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Key> {
        self.pending.extend_from_slice(bytes);
        let mut keys = Vec::new();
        let mut i = 0;

        while i < self.pending.len() {
            let byte = self.pending[i];

            if self.after_cr {
                self.after_cr = false;
                if byte == 0 || byte == LF {
                    i += 1;
                    continue;
                }
            }

            let consumed = match byte {
                ESC => match self.decode_escape(i) {
                    Some((key, len)) => {
                        keys.extend(key);
                        len
                    }
                    None => break,
                },
                CR => {
                    self.after_cr = true;
                    keys.push(Key::Enter);
                    1
                }
                LF => {
                    keys.push(Key::Enter);
                    1
                }
                BS | DEL => {
                    keys.push(Key::Backspace);
                    1
                }
                0x01..=0x1a => {
                    keys.push(Key::Ctrl(char::from(b'a' + byte - 1)));
                    1
                }
                0x00 | 0x1c..=0x1f => 1,
                _ => match decode_utf8(&self.pending[i..]) {
                    Utf8::Char(c, len) => {
                        keys.push(Key::Char(c));
                        len
                    }
                    Utf8::Incomplete => break,
                    Utf8::Invalid => 1,
                },
            };
            i += consumed;
        }

        self.pending.drain(..i);
        keys
    }

    /// Escape sequence at `start`; `None` when more bytes are needed
    fn decode_escape(&self, start: usize) -> Option<(Option<Key>, usize)> {
        let rest = &self.pending[start..];
        match rest.get(1) {
            // A lone ESC at the end of a read is the Esc key itself
            None => Some((Some(Key::Esc), 1)),
            Some(b'[' | b'O') => {
                let final_at = rest[2..]
                    .iter()
                    .position(|b| (0x40..=0x7e).contains(b))?
                    + 2;
                let key = match (&rest[2..final_at], rest[final_at]) {
                    (_, b'A') => Some(Key::Up),
                    (_, b'B') => Some(Key::Down),
                    (_, b'C') => Some(Key::Right),
                    (_, b'D') => Some(Key::Left),
                    (b"5", b'~') => Some(Key::PageUp),
                    (b"6", b'~') => Some(Key::PageDown),
                    _ => None,
                };
                Some((key, final_at + 1))
            }
            Some(_) => Some((Some(Key::Esc), 1)),
        }
    }
}

enum Utf8 {
    Char(char, usize),
    Incomplete,
    Invalid,
}

fn decode_utf8(bytes: &[u8]) -> Utf8 {
    let len = match bytes[0] {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => return Utf8::Invalid,
    };
    if bytes.len() < len {
        return Utf8::Incomplete;
    }
    match std::str::from_utf8(&bytes[..len])
        .ok()
        .and_then(|s| s.chars().next())
    {
        Some(c) => Utf8::Char(c, len),
        None => Utf8::Invalid,
    }
}
