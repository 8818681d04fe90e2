//! Theme and Colors
//!
//! The dashboard palette: a purple brand color for the title line and
//! traffic-light colors for latency.

use crossterm::style::Color;
use monitor_core::LatencyBand;

// ============================================================================
// Brand
// ============================================================================

/// Title and exit hint purple (#6349B6)
pub const BRAND_PURPLE: Color = Color::Rgb {
    r: 0x63,
    g: 0x49,
    b: 0xB6,
};

// ============================================================================
// Latency
// ============================================================================

/// Under 100ms
pub const LATENCY_GOOD: Color = Color::Green;

/// Under 500ms (#FFAA00)
pub const LATENCY_FAIR: Color = Color::Rgb {
    r: 0xFF,
    g: 0xAA,
    b: 0x00,
};

/// 500ms and over
pub const LATENCY_POOR: Color = Color::Red;

/// Color for a latency band
#[must_use]
pub fn latency_color(band: LatencyBand) -> Color {
    match band {
        LatencyBand::Good => LATENCY_GOOD,
        LatencyBand::Fair => LATENCY_FAIR,
        LatencyBand::Poor => LATENCY_POOR,
    }
}
