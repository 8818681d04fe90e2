//! End-to-end dashboard flows over the in-process socket pool
//!
//! These tests wire a `Dashboard` to an `InProcessPool` the same way the
//! terminal app does: transport events in, effects carried out against the
//! pool, scheduled events delivered immediately.

use std::time::{Duration, Instant};

use monitor_core::{
    Dashboard, DashboardConfig, DashboardEvent, Effect, EmitStage, InProcessPeer, InProcessPool,
    Key, ProbeConfig, SocketPool, TerminalSize, TransportEvent, WireMessage, ECHO_EVENT,
};
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;

struct Harness {
    dashboard: Dashboard,
    pool: InProcessPool,
    events: UnboundedReceiver<TransportEvent>,
    /// Scheduled events, delivered on `fire_timers`
    timers: Vec<(Duration, DashboardEvent)>,
    quit: bool,
}

impl Harness {
    fn new(config: DashboardConfig) -> Self {
        let (pool, events) = InProcessPool::new();
        Self {
            dashboard: Dashboard::new(config, TerminalSize::new(100, 40)),
            pool,
            events,
            timers: Vec::new(),
            quit: false,
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send { id, name, data } => {
                    self.pool.emit(id, &name, &data).unwrap();
                }
                Effect::Disconnect(id) => {
                    self.pool.disconnect(id).unwrap();
                }
                Effect::Schedule { after, event } => self.timers.push((after, event)),
                Effect::Quit => self.quit = true,
                Effect::Abort(e) => panic!("unexpected abort: {e}"),
            }
        }
    }

    fn pump(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            let effects = self.dashboard.handle(DashboardEvent::Transport(event));
            self.apply(effects);
        }
    }

    fn keys(&mut self, text: &str) {
        for c in text.chars() {
            self.key(Key::Char(c));
        }
    }

    fn key(&mut self, key: Key) {
        let effects = self.dashboard.handle(DashboardEvent::Key(key));
        self.apply(effects);
        self.pump();
    }

    fn tick(&mut self) {
        let effects = self.dashboard.handle(DashboardEvent::Tick(Instant::now()));
        self.apply(effects);
    }

    fn fire_timers(&mut self) {
        for (_, event) in std::mem::take(&mut self.timers) {
            let effects = self.dashboard.handle(event);
            self.apply(effects);
        }
        self.pump();
    }

    fn attach(&mut self, address: &str) -> InProcessPeer {
        let peer = self.pool.attach(address);
        self.pump();
        peer
    }
}

fn drain(peer: &mut InProcessPeer) -> Vec<WireMessage> {
    std::iter::from_fn(|| peer.try_recv()).collect()
}

#[tokio::test]
async fn emit_to_selected_socket() {
    let mut h = Harness::new(DashboardConfig::default());
    let mut first = h.attach("10.0.0.1:5000");
    let mut second = h.attach("10.0.0.2:5000");

    h.key(Key::Down);
    h.keys("eping");
    h.key(Key::Enter);
    h.keys(r#"{"x":1}"#);
    h.key(Key::Enter);

    assert!(drain(&mut first).is_empty());
    assert_eq!(drain(&mut second), vec![WireMessage::event("ping", json!({"x": 1}))]);
    assert_eq!(h.dashboard.emit().stage(), EmitStage::Dispatched);

    h.fire_timers();
    assert_eq!(h.dashboard.emit().stage(), EmitStage::Idle);
}

#[tokio::test]
async fn broadcast_reaches_everyone() {
    let mut h = Harness::new(DashboardConfig::default());
    let mut peers: Vec<_> = (1..=3).map(|n| h.attach(&format!("10.0.0.{n}:5000"))).collect();

    h.keys("bhello");
    h.key(Key::Enter);
    h.keys(r#""world""#);
    h.key(Key::Enter);

    for peer in &mut peers {
        assert_eq!(drain(peer), vec![WireMessage::event("hello", json!("world"))]);
    }
}

#[tokio::test]
async fn disconnect_command_closes_socket_and_reaps_row() {
    let mut h = Harness::new(DashboardConfig::default());
    let peer = h.attach("10.0.0.1:5000");

    h.keys("x");
    assert!(!peer.is_attached());
    assert_eq!(h.dashboard.registry().len(), 1);
    assert!(!h.dashboard.registry().list()[0].is_connected());

    h.tick();
    assert_eq!(h.dashboard.registry().len(), 1, "row stays for one render");

    h.tick();
    assert!(h.dashboard.registry().is_empty());
    assert_eq!(h.dashboard.viewport().selected(), 0);
}

#[tokio::test]
async fn peer_attachments_show_up_in_registry() {
    let mut h = Harness::new(DashboardConfig::default());
    let peer = h.attach("10.0.0.1:5000");

    peer.send("monitor", json!({"user": "bob", "score": 42})).unwrap();
    peer.send("monitor", json!({"score": 43})).unwrap();
    h.pump();

    let record = &h.dashboard.registry().list()[0];
    let rendered: Vec<_> = record
        .attachments()
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect();
    assert_eq!(rendered, vec!["user: \"bob\"", "score: 43"]);
}

#[tokio::test]
async fn latency_probe_round_trip() {
    let config = DashboardConfig {
        probe: ProbeConfig::enabled(Duration::from_millis(500)),
        ..DashboardConfig::default()
    };
    let mut h = Harness::new(config);
    let mut peer = h.attach("10.0.0.1:5000");

    let probes = drain(&mut peer);
    assert_eq!(probes.len(), 1);
    let WireMessage::Event { name, data } = &probes[0];
    assert_eq!(name, ECHO_EVENT);

    peer.send(ECHO_EVENT, data.clone()).unwrap();
    h.pump();

    let latency = h.dashboard.registry().list()[0].latency().expect("latency recorded");
    assert!(latency < Duration::from_secs(5));

    h.fire_timers();
    assert_eq!(drain(&mut peer).len(), 1, "exactly one follow-up probe");
}

#[tokio::test]
async fn ctrl_c_requests_quit() {
    let mut h = Harness::new(DashboardConfig::default());
    h.key(Key::Ctrl('c'));
    assert!(h.quit);
}
