//! Telnet Negotiation and Stream Parsing
//!
//! Just enough of RFC 854 to drive a full-screen dashboard: character mode,
//! server-side echo suppression and NAWS window size reports. Everything
//! else a client offers is accepted silently and discarded.

// ============================================================================
// Protocol bytes
// ============================================================================

/// Interpret As Command
pub const IAC: u8 = 255;
/// Refuse an option
pub const DONT: u8 = 254;
/// Request an option
pub const DO: u8 = 253;
/// Decline an option
pub const WONT: u8 = 252;
/// Offer an option
pub const WILL: u8 = 251;
/// Subnegotiation begin
pub const SB: u8 = 250;
/// Subnegotiation end
pub const SE: u8 = 240;

// ============================================================================
// Options
// ============================================================================

/// 8-bit clean transmission
pub const OPT_BINARY: u8 = 0;
/// Server echoes input
pub const OPT_ECHO: u8 = 1;
/// Suppress go-ahead (character mode)
pub const OPT_SGA: u8 = 3;
/// Negotiate about window size
pub const OPT_NAWS: u8 = 31;
/// Line mode
pub const OPT_LINEMODE: u8 = 34;

/// Longest subnegotiation payload kept; longer ones are dropped
const MAX_SUBNEGOTIATION: usize = 64;

/// Handshake sent to every viewer on connect
///
/// Puts the client into binary character mode with the server owning echo,
/// and asks it to report window size changes.
#[must_use]
pub fn negotiation() -> Vec<u8> {
    vec![
        IAC, DO, OPT_BINARY, //
        IAC, WILL, OPT_BINARY, //
        IAC, DO, OPT_NAWS, //
        IAC, DO, OPT_SGA, //
        IAC, WILL, OPT_SGA, //
        IAC, WILL, OPT_ECHO, //
        IAC, DONT, OPT_LINEMODE,
    ]
}

/// Double every IAC byte so outbound data is not read as a command
#[must_use]
pub fn escape_output(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 16);
    for &byte in data {
        if byte == IAC {
            out.push(IAC);
        }
        out.push(byte);
    }
    out
}

/// What the parser pulled out of the inbound stream
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TelnetEvent {
    /// Keyboard bytes with all protocol traffic removed
    Data(Vec<u8>),
    /// NAWS report
    WindowSize {
        /// Columns
        width: u16,
        /// Rows
        height: u16,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Normal,
    Iac,
    /// Waiting for the option byte of WILL/WONT/DO/DONT
    Option,
    Subneg,
    SubnegIac,
}

/// Incremental inbound stream parser
///
/// Commands and subnegotiations may be split across reads; state carries
/// over between `push` calls.
#[derive(Debug)]
pub struct TelnetParser {
    state: State,
    subneg: Vec<u8>,
    overflowed: bool,
}

impl Default for TelnetParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TelnetParser {
    /// Parser at the start of a stream
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Normal,
            subneg: Vec::new(),
            overflowed: false,
        }
    }

    /// Feed bytes from the socket, returning events in stream order
    pub fn push(&mut self, bytes: &[u8]) -> Vec<TelnetEvent> {
        let mut events = Vec::new();
        let mut data = Vec::new();

        for &byte in bytes {
            match self.state {
                State::Normal => {
                    if byte == IAC {
                        self.state = State::Iac;
                    } else {
                        data.push(byte);
                    }
                }
                State::Iac => {
                    self.state = match byte {
                        IAC => {
                            data.push(IAC);
                            State::Normal
                        }
                        WILL | WONT | DO | DONT => State::Option,
                        SB => {
                            self.subneg.clear();
                            self.overflowed = false;
                            State::Subneg
                        }
                        // NOP, GA, AYT and friends carry no payload
                        _ => State::Normal,
                    };
                }
                State::Option => {
                    // Replies to our own handshake; nothing to answer
                    self.state = State::Normal;
                }
                State::Subneg => {
                    if byte == IAC {
                        self.state = State::SubnegIac;
                    } else {
                        self.collect(byte);
                    }
                }
                State::SubnegIac => match byte {
                    SE => {
                        self.state = State::Normal;
                        if let Some(event) = self.finish_subnegotiation() {
                            if !data.is_empty() {
                                events.push(TelnetEvent::Data(std::mem::take(&mut data)));
                            }
                            events.push(event);
                        }
                    }
                    IAC => {
                        self.collect(IAC);
                        self.state = State::Subneg;
                    }
                    _ => {
                        tracing::debug!(byte, "malformed telnet subnegotiation");
                        self.subneg.clear();
                        self.state = State::Normal;
                    }
                },
            }
        }

        if !data.is_empty() {
            events.push(TelnetEvent::Data(data));
        }
        events
    }

    fn collect(&mut self, byte: u8) {
        if self.subneg.len() < MAX_SUBNEGOTIATION {
            self.subneg.push(byte);
        } else {
            self.overflowed = true;
        }
    }

    fn finish_subnegotiation(&mut self) -> Option<TelnetEvent> {
        let payload = std::mem::take(&mut self.subneg);
        if self.overflowed {
            return None;
        }
        match payload.as_slice() {
            [OPT_NAWS, w_hi, w_lo, h_hi, h_lo] => {
                let width = u16::from_be_bytes([*w_hi, *w_lo]);
                let height = u16::from_be_bytes([*h_hi, *h_lo]);
                // Some clients report 0x0 before they know their size
                if width == 0 || height == 0 {
                    return None;
                }
                Some(TelnetEvent::WindowSize { width, height })
            }
            _ => None,
        }
    }
}
