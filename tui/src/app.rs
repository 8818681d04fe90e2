//! Main Application
//!
//! The App owns the dashboard and runs the single event loop everything is
//! serialized onto:
//! - Keys from the local terminal or the remote viewer
//! - Transport lifecycle events from the socket pool
//! - Timers the dashboard scheduled (probes, emit summary timeout)
//! - The repaint tick
//!
//! Keys and timers repaint immediately; transport events only mark regions
//! dirty and are picked up by the next tick, so a burst of attachment
//! updates costs one frame.

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::Event;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{interval, MissedTickBehavior};

use monitor_core::{
    Dashboard, DashboardEvent, Effect, SocketPool, TerminalSize, TransportEvent, ViewportError,
};

use crate::keys::translate;
use crate::remote::{ViewerInput, ViewerSession};
use crate::render::render;
use crate::surface::{AnsiSurface, RemoteSink, Surface};

/// What the loop does after an event
#[derive(Debug)]
enum Flow {
    Continue,
    Quit,
    Abort(ViewportError),
}

impl Flow {
    /// Keep the most severe of two outcomes
    fn merge(self, other: Flow) -> Flow {
        match (self, other) {
            (Flow::Abort(e), _) | (_, Flow::Abort(e)) => Flow::Abort(e),
            (Flow::Quit, _) | (_, Flow::Quit) => Flow::Quit,
            _ => Flow::Continue,
        }
    }
}

/// What woke the loop
enum Wake {
    Interrupt,
    Local(Option<io::Result<Event>>),
    Viewer(ViewerSession),
    ViewerInput(Option<ViewerInput>),
    Timer(DashboardEvent),
    Transport(TransportEvent),
    Tick,
}

/// Dashboard plus the channels feeding it
pub struct App<P: SocketPool> {
    dashboard: Dashboard,
    pool: P,
    transport: UnboundedReceiver<TransportEvent>,
    timers_tx: UnboundedSender<DashboardEvent>,
    timers_rx: UnboundedReceiver<DashboardEvent>,
    tick: Duration,
}

impl<P: SocketPool> App<P> {
    /// Wire a dashboard to its pool and the pool's event stream
    pub fn new(
        dashboard: Dashboard,
        pool: P,
        transport: UnboundedReceiver<TransportEvent>,
        tick: Duration,
    ) -> Self {
        let (timers_tx, timers_rx) = mpsc::unbounded_channel();
        Self {
            dashboard,
            pool,
            transport,
            timers_tx,
            timers_rx,
            tick,
        }
    }

    /// The dashboard state
    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    /// Run against the local terminal until ctrl+c
    ///
    /// `input` is normally crossterm's `EventStream`.
    pub async fn run_local<S, I>(&mut self, surface: &mut S, mut input: I) -> anyhow::Result<()>
    where
        S: Surface,
        I: Stream<Item = io::Result<Event>> + Unpin,
    {
        self.resize(surface.size());
        surface.prepare()?;
        render(&mut self.dashboard, surface)?;

        let mut tick = interval(self.tick);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tick.tick().await;
        let interrupt = tokio::signal::ctrl_c();
        tokio::pin!(interrupt);

        loop {
            let wake = tokio::select! {
                biased;
                _ = &mut interrupt => Wake::Interrupt,
                Some(event) = self.transport.recv() => Wake::Transport(event),
                Some(event) = self.timers_rx.recv() => Wake::Timer(event),
                event = input.next() => Wake::Local(event),
                _ = tick.tick() => Wake::Tick,
            };

            let (flow, repaint) = match wake {
                Wake::Interrupt | Wake::Local(None) => (Flow::Quit, false),
                Wake::Local(Some(Err(e))) => {
                    surface.restore()?;
                    return Err(e.into());
                }
                Wake::Local(Some(Ok(Event::Key(key)))) => match translate(key) {
                    Some(key) => (self.handle(DashboardEvent::Key(key)), true),
                    None => (Flow::Continue, false),
                },
                Wake::Local(Some(Ok(Event::Resize(width, height)))) => {
                    let size = TerminalSize::new(width, height);
                    surface.set_size(size);
                    (self.handle(DashboardEvent::Resize(size)), true)
                }
                Wake::Local(Some(Ok(_))) => (Flow::Continue, false),
                Wake::Timer(event) => (self.handle(event), true),
                Wake::Transport(event) => (self.on_transport(event), false),
                Wake::Tick => (self.handle(DashboardEvent::Tick(Instant::now())), true),
                Wake::Viewer(_) | Wake::ViewerInput(_) => (Flow::Continue, false),
            };

            match flow {
                Flow::Continue => {
                    if repaint {
                        render(&mut self.dashboard, surface)?;
                    }
                }
                Flow::Quit => break,
                Flow::Abort(e) => {
                    surface.restore()?;
                    return Err(e.into());
                }
            }
        }

        tracing::info!("Shutting down");
        surface.restore()?;
        Ok(())
    }

    /// Serve viewers from `sessions` until the process is interrupted
    ///
    /// Quitting from a viewer only closes that viewer; the dashboard keeps
    /// tracking sockets for the next one.
    pub async fn run_remote(
        &mut self,
        mut sessions: UnboundedReceiver<ViewerSession>,
        initial_size: TerminalSize,
    ) -> anyhow::Result<()> {
        let mut viewer: Option<(ViewerSession, AnsiSurface<RemoteSink>)> = None;

        let mut tick = interval(self.tick);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tick.tick().await;
        let interrupt = tokio::signal::ctrl_c();
        tokio::pin!(interrupt);

        loop {
            let wake = tokio::select! {
                biased;
                _ = &mut interrupt => Wake::Interrupt,
                Some(session) = sessions.recv(), if viewer.is_none() => Wake::Viewer(session),
                Some(event) = self.transport.recv() => Wake::Transport(event),
                Some(event) = self.timers_rx.recv() => Wake::Timer(event),
                input = next_viewer_input(&mut viewer) => Wake::ViewerInput(input),
                _ = tick.tick() => Wake::Tick,
            };

            let (flow, repaint) = match wake {
                Wake::Interrupt => {
                    if let Some((session, mut surface)) = viewer.take() {
                        let _ = surface.restore();
                        session.close();
                    }
                    break;
                }
                Wake::Viewer(session) => {
                    tracing::info!(peer = %session.peer(), "Viewer attached");
                    let mut surface =
                        AnsiSurface::new(RemoteSink::new(session.output()), initial_size);
                    self.resize(initial_size);
                    self.dashboard.reset_view();
                    if surface.prepare().is_ok() {
                        viewer = Some((session, surface));
                    } else {
                        session.close();
                    }
                    (Flow::Continue, true)
                }
                Wake::ViewerInput(Some(ViewerInput::Key(key))) => {
                    (self.handle(DashboardEvent::Key(key)), true)
                }
                Wake::ViewerInput(Some(ViewerInput::Resize(size))) => {
                    if let Some((_, surface)) = viewer.as_mut() {
                        surface.set_size(size);
                    }
                    (self.handle(DashboardEvent::Resize(size)), true)
                }
                Wake::ViewerInput(Some(ViewerInput::Closed) | None) => {
                    if let Some((session, _)) = viewer.take() {
                        session.close();
                    }
                    self.dashboard.reset_view();
                    (Flow::Continue, false)
                }
                Wake::Timer(event) => (self.handle(event), true),
                Wake::Transport(event) => (self.on_transport(event), false),
                Wake::Tick => (self.handle(DashboardEvent::Tick(Instant::now())), true),
                Wake::Local(_) => (Flow::Continue, false),
            };

            match flow {
                Flow::Continue => {
                    if repaint {
                        self.paint_viewer(&mut viewer);
                    }
                }
                Flow::Quit => {
                    if let Some((session, mut surface)) = viewer.take() {
                        let _ = surface.restore();
                        session.close();
                    }
                    self.dashboard.reset_view();
                }
                Flow::Abort(e) => {
                    if let Some((session, mut surface)) = viewer.take() {
                        let _ = surface.restore();
                        session.close();
                    }
                    return Err(e.into());
                }
            }
        }

        tracing::info!("Shutting down");
        Ok(())
    }

    fn paint_viewer(&mut self, viewer: &mut Option<(ViewerSession, AnsiSurface<RemoteSink>)>) {
        let Some((_, surface)) = viewer.as_mut() else {
            return;
        };
        let painted = if surface.get_ref().is_closed() {
            Err(io::ErrorKind::BrokenPipe.into())
        } else {
            render(&mut self.dashboard, surface)
        };
        if let Err(e) = painted {
            tracing::warn!(error = %e, "Viewer write failed, dropping viewer");
            if let Some((session, _)) = viewer.take() {
                session.close();
            }
            self.dashboard.reset_view();
        }
    }

    fn resize(&mut self, size: TerminalSize) {
        if self.dashboard.size() != size {
            let effects = self.dashboard.handle(DashboardEvent::Resize(size));
            self.apply(effects);
        }
    }

    fn on_transport(&mut self, event: TransportEvent) -> Flow {
        tracing::trace!(connection_id = %event.connection_id(), "Transport event");
        self.handle(DashboardEvent::Transport(event))
    }

    fn handle(&mut self, event: DashboardEvent) -> Flow {
        let effects = self.dashboard.handle(event);
        self.apply(effects)
    }

    fn apply(&mut self, effects: Vec<Effect>) -> Flow {
        let mut flow = Flow::Continue;
        for effect in effects {
            match effect {
                Effect::Send { id, name, data } => {
                    if let Err(e) = self.pool.emit(id, &name, &data) {
                        tracing::warn!(connection_id = %id, event = %name, error = %e, "Emit failed");
                    }
                }
                Effect::Disconnect(id) => {
                    if let Err(e) = self.pool.disconnect(id) {
                        tracing::warn!(connection_id = %id, error = %e, "Disconnect failed");
                    }
                }
                Effect::Schedule { after, event } => {
                    let timers = self.timers_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = timers.send(event);
                    });
                }
                Effect::Quit => flow = flow.merge(Flow::Quit),
                Effect::Abort(e) => flow = flow.merge(Flow::Abort(e)),
            }
        }
        flow
    }
}

async fn next_viewer_input(
    viewer: &mut Option<(ViewerSession, AnsiSurface<RemoteSink>)>,
) -> Option<ViewerInput> {
    match viewer {
        Some((session, _)) => session.recv().await,
        None => std::future::pending().await,
    }
}
