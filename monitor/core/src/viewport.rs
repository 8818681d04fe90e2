//! Viewport and Selection
//!
//! Which slice of the connection list is on screen, which row is selected,
//! and how far the attachment columns are scrolled sideways.
//!
//! The viewport stores offsets only. Callers pass the current connection
//! count and visible row count in, so the registry stays the single source
//! of truth for list length.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rows above and below the body that the list never uses
pub const RESERVED_ROWS: u16 = 5;

/// What to do when vertical scroll computes below zero
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativeScrollPolicy {
    /// Pin to the top and keep going
    #[default]
    Clamp,
    /// Treat as an unrecoverable inconsistency
    Abort,
}

/// Viewport errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ViewportError {
    /// Vertical scroll offset went negative under [`NegativeScrollPolicy::Abort`]
    #[error("vertical scroll computed to {computed}, refusing to render an invalid viewport")]
    NegativeScroll {
        /// The offending offset
        computed: i64,
    },
}

/// Rows available for the connection list
///
/// `min(connection_count, terminal_height - reserved_rows)`, never negative.
#[must_use]
pub fn visible_row_count(connection_count: usize, terminal_height: u16, reserved_rows: u16) -> usize {
    connection_count.min(usize::from(terminal_height.saturating_sub(reserved_rows)))
}

/// Scroll offsets and selection
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Viewport {
    scroll_x: usize,
    scroll_y: usize,
    selected: usize,
    policy: NegativeScrollPolicy,
}

impl Viewport {
    /// Fresh viewport at the top-left with the first row selected
    #[must_use]
    pub fn new(policy: NegativeScrollPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// First attachment column shown
    #[must_use]
    pub fn scroll_x(&self) -> usize {
        self.scroll_x
    }

    /// First list row shown (before render-time clamping)
    #[must_use]
    pub fn scroll_y(&self) -> usize {
        self.scroll_y
    }

    /// Selected list index
    #[must_use]
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Move the selection by `delta` rows.
    ///
    /// Moves that would leave `[0, connection_count)` are ignored. When the
    /// new selection falls outside the visible window, vertical scroll
    /// follows by the same delta. Returns whether the selection moved.
    pub fn move_selection(
        &mut self,
        delta: isize,
        connection_count: usize,
        visible_rows: usize,
    ) -> Result<bool, ViewportError> {
        let Some(target) = self.selected.checked_add_signed(delta) else {
            return Ok(false);
        };
        if target >= connection_count {
            return Ok(false);
        }
        self.selected = target;

        if visible_rows == 0 {
            return Ok(true);
        }

        let in_view = target >= self.scroll_y && target < self.scroll_y + visible_rows;
        if !in_view {
            #[allow(clippy::cast_possible_wrap)]
            let computed = self.scroll_y as i64 + delta as i64;
            let scroll = if computed < 0 {
                match self.policy {
                    NegativeScrollPolicy::Abort => {
                        return Err(ViewportError::NegativeScroll { computed });
                    }
                    NegativeScrollPolicy::Clamp => {
                        tracing::debug!(computed, "Clamping negative vertical scroll");
                        0
                    }
                }
            } else {
                usize::try_from(computed).unwrap_or(0)
            };
            self.scroll_y = scroll.min(connection_count.saturating_sub(visible_rows));
        }

        Ok(true)
    }

    /// Scroll attachment columns by `delta`, keeping at least one column in
    /// view. Returns whether the offset changed.
    pub fn scroll_horizontal(&mut self, delta: isize, max_columns: usize) -> bool {
        let limit = max_columns.saturating_sub(1);
        let target = self
            .scroll_x
            .checked_add_signed(delta)
            .unwrap_or(0)
            .min(limit);
        let changed = target != self.scroll_x;
        self.scroll_x = target;
        changed
    }

    /// Pull every offset back inside bounds after the list shrank or the
    /// terminal changed size
    pub fn clamp_to(&mut self, connection_count: usize, visible_rows: usize, max_columns: usize) {
        self.selected = self.selected.min(connection_count.saturating_sub(1));
        self.scroll_y = self.scroll_y.min(connection_count.saturating_sub(visible_rows));
        self.scroll_x = self.scroll_x.min(max_columns.saturating_sub(1));
    }

    /// List indices to draw
    #[must_use]
    pub fn window(&self, connection_count: usize, visible_rows: usize) -> Range<usize> {
        let start = self.scroll_y.min(connection_count.saturating_sub(visible_rows));
        start..start + visible_rows
    }
}
