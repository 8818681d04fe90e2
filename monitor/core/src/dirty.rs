//! Dirty-Region Tracking
//!
//! The screen is split into regions that are repainted independently.
//! Remote viewers pay per byte, so a keystroke in the payload field should
//! not resend the whole list.
//!
//! # Layout
//!
//! ```text
//! row 0   monitor.io                         (ctrl + c to exit)   ┐ Title
//! row 2   [b]roadcast to all, [e]mit to socket, ...               ┘
//! row 4   > 10.0.0.1:5000   user: "bob", score: 42                ┐ Body
//! row 5     10.0.0.2:5001   ...                                   ┘
//!
//! row 4   Broadcasting to all sockets.                            ┐ EmitName
//! row 6   Event name: ping                                        ┘
//! row 7   Event data (JSON): {"x":1}                              ┐ EmitPayload
//! row 9   Event "ping" emitted to all sockets.                    ┘
//! ```
//!
//! Each region runs from its start row to the bottom of the viewport and is
//! cleared before it is redrawn, so a shorter line never leaves stale
//! characters behind.

/// Row of the title line
pub const TITLE_ROW: u16 = 0;
/// Row of the command legend
pub const COMMANDS_ROW: u16 = 2;
/// First row of the connection list
pub const BODY_ROW: u16 = 4;
/// Row of the emit target line
pub const EMIT_TARGET_ROW: u16 = 4;
/// Row of the event name prompt
pub const EMIT_NAME_ROW: u16 = 6;
/// Row of the payload prompt
pub const EMIT_PAYLOAD_ROW: u16 = 7;
/// Row of the invalid-payload notice or dispatch summary
pub const EMIT_RESULT_ROW: u16 = 9;

/// Independently repainted screen region
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Region {
    /// Title and command legend
    Title,
    /// Connection list
    Body,
    /// Emit overlay: target and event name (and everything below)
    EmitName,
    /// Emit overlay: payload prompt, notice, and dispatch summary
    EmitPayload,
}

impl Region {
    /// First row the region clears
    #[must_use]
    pub const fn start_row(self) -> u16 {
        match self {
            Self::Title => TITLE_ROW,
            Self::Body => BODY_ROW,
            Self::EmitName => EMIT_TARGET_ROW,
            Self::EmitPayload => EMIT_PAYLOAD_ROW,
        }
    }
}

/// One flag per region
///
/// Everything starts dirty so the first frame paints the whole screen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirtyRegions {
    title: bool,
    body: bool,
    emit_name: bool,
    emit_payload: bool,
}

impl Default for DirtyRegions {
    fn default() -> Self {
        Self {
            title: true,
            body: true,
            emit_name: true,
            emit_payload: true,
        }
    }
}

impl DirtyRegions {
    /// All regions dirty
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(&mut self, region: Region) -> &mut bool {
        match region {
            Region::Title => &mut self.title,
            Region::Body => &mut self.body,
            Region::EmitName => &mut self.emit_name,
            Region::EmitPayload => &mut self.emit_payload,
        }
    }

    /// Flag one region
    pub fn mark(&mut self, region: Region) {
        *self.flag(region) = true;
    }

    /// Flag every region (resize, new viewer)
    pub fn mark_all(&mut self) {
        *self = Self::default();
    }

    /// Whether a region is flagged
    #[must_use]
    pub fn is_dirty(&self, region: Region) -> bool {
        match region {
            Region::Title => self.title,
            Region::Body => self.body,
            Region::EmitName => self.emit_name,
            Region::EmitPayload => self.emit_payload,
        }
    }

    /// Whether anything needs painting
    #[must_use]
    pub fn any(&self) -> bool {
        self.title || self.body || self.emit_name || self.emit_payload
    }

    /// Clear a flag, returning whether it was set
    pub fn take(&mut self, region: Region) -> bool {
        std::mem::take(self.flag(region))
    }
}
