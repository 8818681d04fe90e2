//! Dashboard Context
//!
//! One explicit object owning every piece of dashboard state. The event loop
//! feeds it [`DashboardEvent`]s one at a time; each handler runs to
//! completion, mutates state, flags dirty regions, and returns the
//! [`Effect`]s the loop must carry out (sends, disconnects, timers).
//!
//! The dashboard never touches sockets, timers, or the terminal itself, which
//! keeps every behaviour here testable without IO.
//!
//! # Event Flow
//!
//! ```text
//!  TransportEvent ─┐
//!  Key ────────────┤                ┌── Registry
//!  Tick ───────────┼──► Dashboard ──┼── Viewport        ──► Vec<Effect>
//!  Resize ─────────┤    ::handle    ├── EmitMachine
//!  ProbeDue ───────┤                ├── LatencyProber
//!  EmitTimeout ────┘                └── DirtyRegions ──► renderer
//! ```

use std::time::{Duration, Instant};

use serde_json::Value;

use crate::attachment::{AttachmentValue, Attachments};
use crate::config::MonitorConfig;
use crate::dirty::{DirtyRegions, Region};
use crate::emit::{ConfirmOutcome, Dispatch, EmitMachine, EmitStage, EmitTarget};
use crate::input::{Key, Navigation};
use crate::latency::{epoch_millis, LatencyProber, ProbeConfig};
use crate::messages::{ATTACH_EVENT, ATTACH_REPLACE_EVENT, ECHO_EVENT};
use crate::registry::Registry;
use crate::transport::{ConnectionId, TransportEvent};
use crate::viewport::{visible_row_count, NegativeScrollPolicy, Viewport, ViewportError, RESERVED_ROWS};

/// Logical terminal dimensions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TerminalSize {
    /// Columns
    pub width: u16,
    /// Rows
    pub height: u16,
}

impl TerminalSize {
    /// Construct a size
    #[must_use]
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

/// Dashboard behaviour settings
#[derive(Clone, Debug, PartialEq)]
pub struct DashboardConfig {
    /// Rows the list never uses
    pub reserved_rows: u16,
    /// How long the dispatch summary stays on screen
    pub emit_display: Duration,
    /// Minimum time a disconnected row stays visible
    pub reap_grace: Duration,
    /// Latency probing
    pub probe: ProbeConfig,
    /// Negative vertical scroll handling
    pub negative_scroll: NegativeScrollPolicy,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            reserved_rows: RESERVED_ROWS,
            emit_display: Duration::from_millis(2000),
            reap_grace: Duration::ZERO,
            probe: ProbeConfig::disabled(),
            negative_scroll: NegativeScrollPolicy::Clamp,
        }
    }
}

impl From<&MonitorConfig> for DashboardConfig {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            reserved_rows: RESERVED_ROWS,
            emit_display: config.emit_display,
            reap_grace: config.reap_grace,
            probe: ProbeConfig {
                enabled: config.test_latency,
                interval: config.time_between_echoes,
            },
            negative_scroll: config.negative_scroll,
        }
    }
}

/// Everything the loop can feed the dashboard
#[derive(Clone, Debug, PartialEq)]
pub enum DashboardEvent {
    /// Socket lifecycle or traffic
    Transport(TransportEvent),
    /// Decoded keypress
    Key(Key),
    /// Periodic reap-and-repaint
    Tick(Instant),
    /// Viewport dimensions changed
    Resize(TerminalSize),
    /// Time to probe a socket again
    ProbeDue(ConnectionId),
    /// The dispatch summary of this generation has been shown long enough
    EmitTimeout(u64),
}

/// Work the loop performs on the dashboard's behalf
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Emit a named event to one socket
    Send {
        /// Recipient
        id: ConnectionId,
        /// Event name
        name: String,
        /// Event payload
        data: Value,
    },
    /// Close one socket
    Disconnect(ConnectionId),
    /// Feed `event` back in after `after`
    Schedule {
        /// Delay
        after: Duration,
        /// Event to deliver
        event: DashboardEvent,
    },
    /// The user asked to leave (ctrl+c)
    Quit,
    /// The viewport is inconsistent; stop without rendering
    Abort(ViewportError),
}

/// The dashboard context object
#[derive(Debug)]
pub struct Dashboard {
    // === Configuration ===
    config: DashboardConfig,
    size: TerminalSize,

    // === State ===
    registry: Registry,
    viewport: Viewport,
    emit: EmitMachine,
    prober: LatencyProber,

    // === Rendering ===
    dirty: DirtyRegions,
}

impl Dashboard {
    /// Create a dashboard for a terminal of `size`
    #[must_use]
    pub fn new(config: DashboardConfig, size: TerminalSize) -> Self {
        Self {
            viewport: Viewport::new(config.negative_scroll),
            prober: LatencyProber::new(config.probe.clone()),
            config,
            size,
            registry: Registry::new(),
            emit: EmitMachine::new(),
            dirty: DirtyRegions::new(),
        }
    }

    /// Connection records
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Scroll and selection
    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Emit wizard
    #[must_use]
    pub fn emit(&self) -> &EmitMachine {
        &self.emit
    }

    /// Current logical terminal size
    #[must_use]
    pub fn size(&self) -> TerminalSize {
        self.size
    }

    /// Dirty flags, for the renderer to consume
    pub fn dirty_mut(&mut self) -> &mut DirtyRegions {
        &mut self.dirty
    }

    /// Dirty flags
    #[must_use]
    pub fn dirty(&self) -> &DirtyRegions {
        &self.dirty
    }

    /// Rows of the list currently on screen
    #[must_use]
    pub fn visible_rows(&self) -> usize {
        visible_row_count(self.registry.len(), self.size.height, self.config.reserved_rows)
    }

    /// Drop any emit in progress and schedule a full repaint
    ///
    /// Used when a remote viewer goes away so the next one starts clean.
    pub fn reset_view(&mut self) {
        self.emit.reset();
        self.dirty.mark_all();
    }

    /// Handle one event using the current clocks
    pub fn handle(&mut self, event: DashboardEvent) -> Vec<Effect> {
        self.handle_at(event, Instant::now(), epoch_millis())
    }

    /// Handle one event at an explicit monotonic and wall-clock time
    pub fn handle_at(&mut self, event: DashboardEvent, now: Instant, now_ms: i64) -> Vec<Effect> {
        let mut effects = Vec::new();
        match event {
            DashboardEvent::Transport(event) => self.on_transport(event, now, now_ms, &mut effects),
            DashboardEvent::Key(key) => self.on_key(key, &mut effects),
            DashboardEvent::Tick(at) => self.on_tick(at),
            DashboardEvent::Resize(size) => self.on_resize(size),
            DashboardEvent::ProbeDue(id) => self.on_probe_due(id, now_ms, &mut effects),
            DashboardEvent::EmitTimeout(generation) => {
                if self.emit.finish(generation) {
                    self.dirty.mark(Region::Body);
                }
            }
        }
        effects
    }

    // =========================================================================
    // Transport
    // =========================================================================

    fn on_transport(&mut self, event: TransportEvent, now: Instant, now_ms: i64, effects: &mut Vec<Effect>) {
        match event {
            TransportEvent::Attached { id, remote_address } => {
                if self.registry.attach(id, remote_address) {
                    tracing::info!(connection_id = %id, "Socket joined dashboard");
                    self.dirty.mark(Region::Body);
                    self.send_probe(id, now_ms, effects);
                }
            }
            TransportEvent::Detached { id } => {
                self.prober.forget(id);
                if self.registry.mark_disconnected(id, now) {
                    tracing::info!(connection_id = %id, "Socket left dashboard");
                    self.dirty.mark(Region::Body);
                }
            }
            TransportEvent::Inbound { id, name, data } => match name.as_str() {
                ECHO_EVENT => self.on_echo(id, &data, now_ms, effects),
                ATTACH_EVENT => self.on_attach_update(id, &data),
                ATTACH_REPLACE_EVENT => self.on_attach_replace(id, &data),
                _ => tracing::trace!(connection_id = %id, event = %name, "Ignoring inbound event"),
            },
        }
    }

    fn on_echo(&mut self, id: ConnectionId, data: &Value, now_ms: i64, effects: &mut Vec<Effect>) {
        let Some(latency) = self.prober.complete(id, data, now_ms) else {
            return;
        };
        if self.registry.record_latency(id, latency) {
            self.dirty.mark(Region::Body);
            effects.push(Effect::Schedule {
                after: self.prober.interval(),
                event: DashboardEvent::ProbeDue(id),
            });
        }
    }

    fn on_attach_update(&mut self, id: ConnectionId, data: &Value) {
        let Some(object) = data.as_object() else {
            tracing::debug!(connection_id = %id, "Attachment update is not an object");
            return;
        };
        let mut changed = false;
        for (name, value) in object {
            match AttachmentValue::from_json(value) {
                Some(value) => changed |= self.registry.set_attachment(id, name.clone(), value),
                None => tracing::debug!(connection_id = %id, attachment = %name, "Skipping non-displayable attachment"),
            }
        }
        if changed {
            self.dirty.mark(Region::Body);
        }
    }

    fn on_attach_replace(&mut self, id: ConnectionId, data: &Value) {
        let Some(object) = data.as_object() else {
            tracing::debug!(connection_id = %id, "Attachment replacement is not an object");
            return;
        };
        let (attachments, skipped): (Attachments, _) = Attachments::from_json_object(object);
        if !skipped.is_empty() {
            tracing::debug!(connection_id = %id, skipped = ?skipped, "Skipping non-displayable attachments");
        }
        if self.registry.replace_attachments(id, attachments) {
            self.clamp_viewport();
            self.dirty.mark(Region::Body);
        }
    }

    fn on_probe_due(&mut self, id: ConnectionId, now_ms: i64, effects: &mut Vec<Effect>) {
        match self.registry.get(id) {
            Some(record) if record.is_connected() => self.send_probe(id, now_ms, effects),
            _ => tracing::trace!(connection_id = %id, "Probe cycle ended"),
        }
    }

    fn send_probe(&mut self, id: ConnectionId, now_ms: i64, effects: &mut Vec<Effect>) {
        if let Some(data) = self.prober.start(id, now_ms) {
            effects.push(Effect::Send {
                id,
                name: ECHO_EVENT.to_string(),
                data,
            });
        }
    }

    // =========================================================================
    // Timers and Resize
    // =========================================================================

    fn on_tick(&mut self, now: Instant) {
        if self.registry.reap_disconnected(now, self.config.reap_grace) {
            self.clamp_viewport();
            self.dirty.mark(Region::Body);
        }
    }

    fn on_resize(&mut self, size: TerminalSize) {
        tracing::debug!(width = size.width, height = size.height, "Viewport resized");
        self.size = size;
        self.clamp_viewport();
        self.dirty.mark_all();
    }

    fn clamp_viewport(&mut self) {
        let visible = self.visible_rows();
        self.viewport
            .clamp_to(self.registry.len(), visible, self.registry.max_attachment_count());
    }

    // =========================================================================
    // Input Dispatch
    // =========================================================================

    fn on_key(&mut self, key: Key, effects: &mut Vec<Effect>) {
        if key == Key::INTERRUPT {
            self.emit.reset();
            effects.push(Effect::Quit);
            return;
        }

        if self.emit.is_active() {
            self.on_emit_key(key, effects);
        } else {
            self.on_list_key(key, effects);
        }
    }

    fn on_list_key(&mut self, key: Key, effects: &mut Vec<Effect>) {
        if let Some(navigation) = key.navigation() {
            self.navigate(navigation, effects);
            return;
        }

        match key {
            Key::Char('e') => {
                let Some(record) = self.registry.get_index(self.viewport.selected()) else {
                    return;
                };
                let target = EmitTarget::Connection {
                    id: record.id(),
                    remote_address: record.remote_address().to_string(),
                };
                if self.emit.begin(target) {
                    self.dirty.mark(Region::EmitName);
                }
            }
            Key::Char('b') => {
                if self.emit.begin(EmitTarget::Broadcast) {
                    self.dirty.mark(Region::EmitName);
                }
            }
            Key::Char('x') => {
                if let Some(record) = self.registry.get_index(self.viewport.selected()) {
                    if record.is_connected() {
                        effects.push(Effect::Disconnect(record.id()));
                    }
                }
            }
            _ => {}
        }
    }

    fn navigate(&mut self, navigation: Navigation, effects: &mut Vec<Effect>) {
        let count = self.registry.len();
        let visible = self.visible_rows();
        let columns = self.registry.max_attachment_count();

        let moved = match navigation {
            Navigation::Up => self.viewport.move_selection(-1, count, visible),
            Navigation::Down => self.viewport.move_selection(1, count, visible),
            Navigation::PageUp => self.viewport.move_selection(-page(visible), count, visible),
            Navigation::PageDown => self.viewport.move_selection(page(visible), count, visible),
            Navigation::Left => Ok(self.viewport.scroll_horizontal(-1, columns)),
            Navigation::Right => Ok(self.viewport.scroll_horizontal(1, columns)),
        };

        match moved {
            Ok(true) => self.dirty.mark(Region::Body),
            Ok(false) => {}
            Err(e) => {
                tracing::error!(error = %e, "Viewport inconsistency");
                effects.push(Effect::Abort(e));
            }
        }
    }

    fn on_emit_key(&mut self, key: Key, effects: &mut Vec<Effect>) {
        let region = match self.emit.stage() {
            EmitStage::TypingPayload => Region::EmitPayload,
            _ => Region::EmitName,
        };

        match key {
            Key::Esc => {
                if self.emit.cancel() {
                    self.dirty.mark(Region::Body);
                }
            }
            Key::Enter => match self.emit.confirm() {
                ConfirmOutcome::Ignored => {}
                ConfirmOutcome::AwaitingPayload | ConfirmOutcome::Rejected => {
                    self.dirty.mark(Region::EmitPayload);
                }
                ConfirmOutcome::Dispatched(dispatch) => {
                    self.dispatch(dispatch, effects);
                    self.dirty.mark(Region::EmitPayload);
                }
            },
            Key::Backspace => {
                if self.emit.backspace() {
                    self.dirty.mark(region);
                }
            }
            Key::Char(c) => {
                if self.emit.push_char(c) {
                    self.dirty.mark(region);
                }
            }
            _ => {}
        }
    }

    fn dispatch(&mut self, dispatch: Dispatch, effects: &mut Vec<Effect>) {
        let Dispatch {
            target,
            name,
            data,
            generation,
        } = dispatch;

        match target {
            EmitTarget::Broadcast => {
                let recipients = self.registry.list().iter().filter(|r| r.is_connected());
                for record in recipients {
                    effects.push(Effect::Send {
                        id: record.id(),
                        name: name.clone(),
                        data: data.clone(),
                    });
                }
                tracing::info!(event = %name, "Broadcast emitted");
            }
            EmitTarget::Connection { id, .. } => match self.registry.get(id) {
                Some(record) if record.is_connected() => {
                    tracing::info!(connection_id = %id, event = %name, "Event emitted");
                    effects.push(Effect::Send { id, name, data });
                }
                _ => tracing::debug!(connection_id = %id, "Emit target gone, dropping event"),
            },
        }

        effects.push(Effect::Schedule {
            after: self.config.emit_display,
            event: DashboardEvent::EmitTimeout(generation),
        });
    }
}

/// Rows one page key moves the selection
#[allow(clippy::cast_possible_wrap)]
fn page(visible: usize) -> isize {
    visible.max(1) as isize
}
