//! Dashboard Rendering
//!
//! Paints whichever regions the dashboard flagged dirty onto a [`Surface`].
//! Every region erases from its first row to the bottom of the terminal
//! before drawing, so a shorter line never leaves stale characters behind.
//!
//! ```text
//! row 0  monitor.io                                   (ctrl + c to exit)
//! row 2  [b]roadcast to all, [e]mit to socket, [x] disconnect socket, ...
//! row 4  > 10.0.0.1:5000   12ms user: "bob", score: 42
//! row 5  10.0.0.2:5000     disconnected...
//! ```
//!
//! While the emit wizard is open the list is replaced by the overlay:
//!
//! ```text
//! row 4  <target row, or "Broadcasting to all sockets.">
//! row 6  Event name: ping
//! row 7  Event data (JSON): {"x":1}
//! row 8  Invalid JSON data.
//! row 9  Event "ping" emitted to 10.0.0.1:5000
//! ```

use std::io;

use monitor_core::dirty::{
    BODY_ROW, COMMANDS_ROW, EMIT_NAME_ROW, EMIT_PAYLOAD_ROW, EMIT_RESULT_ROW, EMIT_TARGET_ROW,
    TITLE_ROW,
};
use monitor_core::{
    ConnectionRecord, Dashboard, EmitNotice, EmitStage, EmitTarget, LatencyBand, Region,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::surface::{Style, Surface};
use crate::theme::{latency_color, BRAND_PURPLE};

/// Application name in the title bar
pub const TITLE: &str = "monitor.io";

/// Right-aligned exit hint
pub const EXIT_HINT: &str = "(ctrl + c to exit)";

/// Shown when the registry is empty
pub const NO_CONNECTIONS: &str = "No sockets connected.";

/// Key legend: bold key, then the rest of the word
const COMMANDS: [(&str, &str); 4] = [
    ("b", "roadcast to all"),
    ("e", "mit to socket"),
    ("x", " disconnect socket"),
    ("hjkl", " to scroll"),
];

/// Address column width, selection marker included
const ADDRESS_COLUMN: usize = 17;

/// Cells reserved left of the attachment text
const ATTACHMENT_MARGIN: usize = ADDRESS_COLUMN + 1;

const ELLIPSIS: &str = "...";

const NAME_PROMPT: &str = "Event name: ";
const PAYLOAD_PROMPT: &str = "Event data (JSON): ";
const INVALID_PAYLOAD: &str = "Invalid JSON data.";
const BROADCAST_BANNER: &str = "Broadcasting to all sockets.";

/// A run of text in one style
pub type Span = (String, Style);

/// Paint every dirty region, then flush once
///
/// Returns whether anything was drawn.
pub fn render<S: Surface + ?Sized>(dashboard: &mut Dashboard, surface: &mut S) -> io::Result<bool> {
    if !dashboard.dirty().any() {
        return Ok(false);
    }
    let mut drew = false;

    if dashboard.dirty_mut().take(Region::Title) {
        render_title(surface)?;
        // The title clear wiped everything below it too
        dashboard.dirty_mut().mark(Region::Body);
        dashboard.dirty_mut().mark(Region::EmitName);
        drew = true;
    }

    if dashboard.emit().is_active() {
        if dashboard.dirty_mut().take(Region::EmitName) {
            dashboard.dirty_mut().take(Region::EmitPayload);
            render_emit_name(dashboard, surface)?;
            render_emit_payload(dashboard, surface)?;
            drew = true;
        } else if dashboard.dirty_mut().take(Region::EmitPayload) {
            render_emit_payload(dashboard, surface)?;
            drew = true;
        }
    } else if dashboard.dirty_mut().take(Region::Body) {
        render_body(dashboard, surface)?;
        drew = true;
    }

    if drew {
        place_cursor(dashboard, surface)?;
        surface.flush()?;
    }
    Ok(drew)
}

fn render_title<S: Surface + ?Sized>(surface: &mut S) -> io::Result<()> {
    let width = usize::from(surface.size().width);
    surface.clear_from(Region::Title.start_row())?;

    surface.move_to(0, TITLE_ROW)?;
    surface.print_styled(TITLE, Style::fg(BRAND_PURPLE).bold())?;
    let hint_column = width.saturating_sub(EXIT_HINT.len());
    if hint_column > TITLE.len() {
        surface.move_to(to_column(hint_column), TITLE_ROW)?;
        surface.print_styled(EXIT_HINT, Style::fg(BRAND_PURPLE))?;
    }

    surface.move_to(0, COMMANDS_ROW)?;
    for (i, (key, rest)) in COMMANDS.iter().enumerate() {
        if i > 0 {
            surface.print(", ")?;
        }
        surface.print_styled(&format!("[{key}]"), Style::BOLD)?;
        surface.print(rest)?;
    }
    Ok(())
}

fn render_body<S: Surface + ?Sized>(dashboard: &Dashboard, surface: &mut S) -> io::Result<()> {
    surface.clear_from(Region::Body.start_row())?;
    surface.move_to(0, BODY_ROW)?;

    let registry = dashboard.registry();
    if registry.is_empty() {
        return surface.print(NO_CONNECTIONS);
    }

    let viewport = dashboard.viewport();
    let window = viewport.window(registry.len(), dashboard.visible_rows());
    let width = surface.size().width;
    for (row, index) in (BODY_ROW..).zip(window) {
        let Some(record) = registry.get_index(index) else {
            break;
        };
        surface.move_to(0, row)?;
        let spans = connection_row(record, index == viewport.selected(), viewport.scroll_x(), width);
        print_spans(surface, &spans)?;
    }
    Ok(())
}

/// Target, name prompt and everything under them
fn render_emit_name<S: Surface + ?Sized>(dashboard: &Dashboard, surface: &mut S) -> io::Result<()> {
    let emit = dashboard.emit();
    surface.clear_from(Region::EmitName.start_row())?;
    surface.move_to(0, EMIT_TARGET_ROW)?;

    match emit.target() {
        Some(EmitTarget::Broadcast) | None => {
            surface.print_styled(BROADCAST_BANNER, Style::BOLD)?;
        }
        Some(EmitTarget::Connection { id, remote_address }) => {
            let spans = match dashboard.registry().get(*id) {
                Some(record) => connection_row(
                    record,
                    false,
                    dashboard.viewport().scroll_x(),
                    surface.size().width,
                ),
                None => disconnected_row(remote_address),
            };
            print_spans(surface, &spans)?;
        }
    }

    surface.move_to(0, EMIT_NAME_ROW)?;
    surface.print(NAME_PROMPT)?;
    surface.print(emit.event_name())
}

/// Payload prompt, notice and dispatch summary
fn render_emit_payload<S: Surface + ?Sized>(
    dashboard: &Dashboard,
    surface: &mut S,
) -> io::Result<()> {
    let emit = dashboard.emit();
    surface.clear_from(Region::EmitPayload.start_row())?;

    if !matches!(emit.stage(), EmitStage::TypingPayload | EmitStage::Dispatched) {
        return Ok(());
    }

    surface.move_to(0, EMIT_PAYLOAD_ROW)?;
    surface.print(PAYLOAD_PROMPT)?;
    surface.print(emit.payload())?;

    if emit.notice() == Some(EmitNotice::InvalidPayload) {
        surface.move_to(0, EMIT_PAYLOAD_ROW + 1)?;
        surface.print(INVALID_PAYLOAD)?;
    }

    if emit.stage() == EmitStage::Dispatched {
        surface.move_to(0, EMIT_RESULT_ROW)?;
        surface.print("Event \"")?;
        surface.print_styled(emit.event_name(), Style::BOLD)?;
        surface.print("\" emitted to ")?;
        let destination = match emit.target() {
            Some(EmitTarget::Connection { remote_address, .. }) => printable(remote_address),
            Some(EmitTarget::Broadcast) | None => "all sockets.".to_string(),
        };
        surface.print_styled(&destination, Style::BOLD)?;
    }
    Ok(())
}

/// Cursor after the text being typed; hidden otherwise
fn place_cursor<S: Surface + ?Sized>(dashboard: &Dashboard, surface: &mut S) -> io::Result<()> {
    let emit = dashboard.emit();
    let (row, text) = match emit.stage() {
        EmitStage::TypingEventName => (EMIT_NAME_ROW, format!("{NAME_PROMPT}{}", emit.event_name())),
        EmitStage::TypingPayload => (EMIT_PAYLOAD_ROW, format!("{PAYLOAD_PROMPT}{}", emit.payload())),
        _ => return surface.hide_cursor(),
    };
    surface.move_to(to_column(text.width()), row)?;
    surface.show_cursor()
}

/// Spans for one list row
#[must_use]
pub fn connection_row(
    record: &ConnectionRecord,
    selected: bool,
    scroll_x: usize,
    width: u16,
) -> Vec<Span> {
    if !record.is_connected() {
        return disconnected_row(record.remote_address());
    }

    let address = printable(record.remote_address());
    let label = if selected { format!("> {address}") } else { address };
    let mut spans = vec![(pad(&label, ADDRESS_COLUMN), Style::BOLD)];

    let mut used = 0;
    if let Some(latency) = record.latency() {
        let text = format!(" {}ms", latency.as_millis());
        used = text.width();
        spans.push((text, Style::fg(latency_color(LatencyBand::classify(latency)))));
    }

    let attachments = record.attachments();
    let last = attachments.len().saturating_sub(1);
    let mut buffer = String::new();
    for (i, (name, value)) in attachments.iter().enumerate().skip(scroll_x) {
        buffer.push_str(&printable(&format!(" {name}: {value}")));
        if i < last {
            buffer.push(',');
        }
    }

    let limit = usize::from(width).saturating_sub(ATTACHMENT_MARGIN + used);
    if buffer.width() > limit {
        let mut cut = truncate(&buffer, limit.saturating_sub(ELLIPSIS.len()));
        cut.push_str(ELLIPSIS);
        buffer = cut;
    }
    if !buffer.is_empty() {
        spans.push((buffer, Style::PLAIN));
    }
    spans
}

fn disconnected_row(remote_address: &str) -> Vec<Span> {
    vec![
        (printable(remote_address), Style::BOLD),
        (" disconnected...".to_string(), Style::PLAIN),
    ]
}

fn print_spans<S: Surface + ?Sized>(surface: &mut S, spans: &[Span]) -> io::Result<()> {
    for (text, style) in spans {
        if *style == Style::PLAIN {
            surface.print(text)?;
        } else {
            surface.print_styled(text, *style)?;
        }
    }
    Ok(())
}

/// Peer-supplied text with control characters replaced by `?`
fn printable(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { '?' } else { c })
        .collect()
}

/// Right-pad with spaces to `width` cells; longer text is left alone
fn pad(text: &str, width: usize) -> String {
    let mut padded = text.to_string();
    let fill = width.saturating_sub(text.width());
    padded.extend(std::iter::repeat(' ').take(fill));
    padded
}

/// Longest prefix fitting in `max` cells
fn truncate(text: &str, max: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > max {
            break;
        }
        used += w;
        out.push(c);
    }
    out
}

fn to_column(cells: usize) -> u16 {
    u16::try_from(cells).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::AnsiSurface;
    use monitor_core::{
        ConnectionId, DashboardConfig, DashboardEvent, Key, TerminalSize, TransportEvent,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn dashboard() -> Dashboard {
        Dashboard::new(DashboardConfig::default(), TerminalSize::new(100, 40))
    }

    fn surface() -> AnsiSurface<Vec<u8>> {
        AnsiSurface::new(Vec::new(), TerminalSize::new(100, 40))
    }

    fn attach(dash: &mut Dashboard, raw: u64, address: &str) -> ConnectionId {
        let id = ConnectionId::from_raw(raw);
        dash.handle(DashboardEvent::Transport(TransportEvent::Attached {
            id,
            remote_address: address.to_string(),
        }));
        id
    }

    fn paint(dash: &mut Dashboard) -> String {
        let mut s = surface();
        render(dash, &mut s).unwrap();
        String::from_utf8_lossy(&s.into_inner()).into_owned()
    }

    fn plain_text(spans: &[Span]) -> String {
        spans.iter().map(|(text, _)| text.as_str()).collect()
    }

    #[test]
    fn test_first_frame_has_title_and_empty_message() {
        let mut dash = dashboard();
        let out = paint(&mut dash);
        assert!(out.contains(TITLE));
        assert!(out.contains(EXIT_HINT));
        assert!(out.contains("[hjkl]"));
        assert!(out.contains(NO_CONNECTIONS));
    }

    #[test]
    fn test_clean_dashboard_draws_nothing() {
        let mut dash = dashboard();
        paint(&mut dash);
        let mut s = surface();
        assert!(!render(&mut dash, &mut s).unwrap());
        assert!(s.get_ref().is_empty());
    }

    #[test]
    fn test_attachments_in_row() {
        let mut dash = dashboard();
        let id = attach(&mut dash, 1, "10.0.0.1:5000");
        dash.handle(DashboardEvent::Transport(TransportEvent::Inbound {
            id,
            name: "monitor".to_string(),
            data: json!({"user": "bob", "score": 42}),
        }));
        let out = paint(&mut dash);
        assert!(out.contains("> 10.0.0.1:5000"));
        assert!(out.contains(r#" user: "bob", score: 42"#));
        assert!(!out.contains(NO_CONNECTIONS));
    }

    #[test]
    fn test_body_only_repaint_keeps_title() {
        let mut dash = dashboard();
        paint(&mut dash);
        attach(&mut dash, 1, "10.0.0.1:5000");
        let out = paint(&mut dash);
        assert!(!out.contains(TITLE));
        assert!(out.contains("10.0.0.1:5000"));
    }

    #[test]
    fn test_long_attachments_truncated() {
        let mut dash = Dashboard::new(DashboardConfig::default(), TerminalSize::new(40, 20));
        let id = attach(&mut dash, 1, "10.0.0.1:5000");
        dash.handle(DashboardEvent::Transport(TransportEvent::Inbound {
            id,
            name: "monitor".to_string(),
            data: json!({"a": "xxxxxxxxxx", "b": "yyyyyyyyyy", "c": "zzzzzzzzzz"}),
        }));
        let record = &dash.registry().list()[0];
        let spans = connection_row(record, false, 0, 40);
        let text = plain_text(&spans);
        assert!(text.ends_with(ELLIPSIS));
        assert_eq!(text.width(), 40 - 1);
    }

    #[test]
    fn test_scroll_x_skips_leading_attachments() {
        let mut dash = dashboard();
        let id = attach(&mut dash, 1, "10.0.0.1:5000");
        dash.handle(DashboardEvent::Transport(TransportEvent::Inbound {
            id,
            name: "monitor".to_string(),
            data: json!({"a": 1, "b": 2}),
        }));
        let record = &dash.registry().list()[0];
        let text = plain_text(&connection_row(record, false, 1, 100));
        assert!(text.ends_with(" b: 2"));
        assert!(!text.contains("a: 1"));
    }

    #[test]
    fn test_disconnected_row() {
        let mut dash = dashboard();
        let id = attach(&mut dash, 1, "10.0.0.1:5000");
        dash.handle(DashboardEvent::Transport(TransportEvent::Detached { id }));
        let record = &dash.registry().list()[0];
        assert_eq!(
            plain_text(&connection_row(record, true, 0, 100)),
            "10.0.0.1:5000 disconnected..."
        );
    }

    #[test]
    fn test_emit_overlay_and_summary() {
        let mut dash = dashboard();
        attach(&mut dash, 1, "10.0.0.1:5000");
        paint(&mut dash);

        dash.handle(DashboardEvent::Key(Key::Char('b')));
        for c in "ping".chars() {
            dash.handle(DashboardEvent::Key(Key::Char(c)));
        }
        let out = paint(&mut dash);
        assert!(out.contains(BROADCAST_BANNER));
        assert!(out.contains("Event name: ping"));
        assert!(out.contains("\x1b[?25h"), "cursor shown while typing");

        dash.handle(DashboardEvent::Key(Key::Enter));
        for c in "nope".chars() {
            dash.handle(DashboardEvent::Key(Key::Char(c)));
        }
        dash.handle(DashboardEvent::Key(Key::Enter));
        assert!(paint(&mut dash).contains(INVALID_PAYLOAD));

        for c in "1".chars() {
            dash.handle(DashboardEvent::Key(Key::Char(c)));
        }
        dash.handle(DashboardEvent::Key(Key::Enter));
        let out = paint(&mut dash);
        assert!(out.contains("emitted to "));
        assert!(out.contains("all sockets."));
        assert!(out.contains("\x1b[?25l"), "cursor hidden after dispatch");
    }

    #[test]
    fn test_control_characters_never_reach_the_terminal() {
        let mut dash = dashboard();
        let id = attach(&mut dash, 1, "10.0.0.1\x1b[2J");
        dash.handle(DashboardEvent::Transport(TransportEvent::Inbound {
            id,
            name: "monitor".to_string(),
            data: json!({"note\r": "a\x1b[2Jb\n"}),
        }));
        let record = &dash.registry().list()[0];
        let text = plain_text(&connection_row(record, false, 0, 100));
        assert!(!text.chars().any(char::is_control), "{text:?}");
        assert!(text.contains("10.0.0.1?[2J"));
        assert!(text.ends_with(r#" note?: "a?[2Jb?""#));

        dash.handle(DashboardEvent::Transport(TransportEvent::Detached { id }));
        let record = &dash.registry().list()[0];
        assert_eq!(
            plain_text(&connection_row(record, false, 0, 100)),
            "10.0.0.1?[2J disconnected..."
        );
    }

    #[test]
    fn test_pad_and_truncate_use_display_width() {
        assert_eq!(pad("ab", 4), "ab  ");
        assert_eq!(pad("abcdef", 4), "abcdef");
        assert_eq!(truncate("日本語", 4), "日本");
    }
}
