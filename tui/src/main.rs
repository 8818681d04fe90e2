//! monitor.io Entry Point
//!
//! Starts the monitored-socket listener and shows the dashboard on this
//! terminal, or serves it over telnet with `--remote`.
//!
//! Usage:
//!   monitor-io [OPTIONS]
//!
//! Options:
//!   --listen <ADDR>     Address monitored sockets connect to
//!   --remote            Serve the dashboard over telnet instead
//!   --port <PORT>       Telnet port (default: 1337)
//!   --local-only        Only admit viewers from loopback
//!   --test-latency      Probe round-trip latency of every socket

use std::fs::File;
use std::io::{self, IsTerminal};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use crossterm::event::EventStream;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use monitor_core::{
    default_config_path, load_config_from_path, Dashboard, DashboardConfig, MonitorConfig,
    TcpSocketPool, TcpSocketServer, TerminalSize,
};
use monitor_tui::remote::RemoteViewerServer;
use monitor_tui::surface::{install_panic_hook, local_size, AnsiSurface, TerminalGuard};
use monitor_tui::App;

/// Live dashboard of socket connections
#[derive(Parser, Debug)]
#[command(name = "monitor-io", version, about)]
struct Cli {
    /// Config file (default: ~/.config/monitor-io/monitor.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Address monitored sockets connect to
    #[arg(long, value_name = "ADDR")]
    listen: Option<SocketAddr>,

    /// Serve the dashboard over telnet instead of this terminal
    #[arg(long)]
    remote: bool,

    /// Telnet port for the remote viewer
    #[arg(long)]
    port: Option<u16>,

    /// Only admit viewers connecting from loopback
    #[arg(long)]
    local_only: bool,

    /// Probe round-trip latency of every socket
    #[arg(long)]
    test_latency: bool,

    /// Milliseconds between a probe reply and the next probe
    #[arg(long, value_name = "MS")]
    echo_interval: Option<u64>,

    /// Dashboard width when the terminal cannot report one
    #[arg(long)]
    width: Option<u16>,

    /// Dashboard height when the terminal cannot report one
    #[arg(long)]
    height: Option<u16>,

    /// Write logs to this file
    #[arg(long, value_name = "PATH", env = "MONITOR_IO_LOG")]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Flags win over environment and file
    fn apply(&self, config: &mut MonitorConfig) {
        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if self.remote {
            config.remote = true;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.local_only {
            config.local_only = true;
        }
        if self.test_latency {
            config.test_latency = true;
        }
        if let Some(ms) = self.echo_interval {
            config.time_between_echoes = Duration::from_millis(ms);
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(config_path.as_deref())
        .context("failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;

    init_logging(cli.log_file.as_deref(), config.remote)?;
    tracing::info!(
        listen = %config.listen,
        remote = config.remote,
        test_latency = config.test_latency,
        "Starting monitor.io"
    );

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let server = TcpSocketServer::bind(config.listen, events_tx)
        .await
        .with_context(|| format!("failed to listen on {}", config.listen))?;
    let pool = server.pool();
    tokio::spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!(error = %e, "Socket listener stopped");
        }
    });

    let fallback = TerminalSize::new(config.width, config.height);
    if config.remote {
        let dashboard = Dashboard::new(DashboardConfig::from(&config), fallback);
        let mut app = App::new(dashboard, pool, events_rx, config.tick_interval);
        run_remote(&mut app, &config, fallback).await
    } else {
        let size = local_size(fallback);
        let dashboard = Dashboard::new(DashboardConfig::from(&config), size);
        let mut app = App::new(dashboard, pool, events_rx, config.tick_interval);
        run_local(&mut app, size).await
    }
}

async fn run_local(
    app: &mut App<TcpSocketPool>,
    size: TerminalSize,
) -> anyhow::Result<()> {
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        bail!("monitor-io needs a terminal; use --remote to serve the dashboard over telnet");
    }

    install_panic_hook();
    let _guard = TerminalGuard::enter().context("failed to enter raw mode")?;
    let mut surface = AnsiSurface::new(io::stdout(), size);
    app.run_local(&mut surface, EventStream::new()).await
}

async fn run_remote(
    app: &mut App<TcpSocketPool>,
    config: &MonitorConfig,
    size: TerminalSize,
) -> anyhow::Result<()> {
    let (sessions_tx, sessions_rx) = mpsc::unbounded_channel();
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
    let viewers = RemoteViewerServer::bind(addr, config.local_only, sessions_tx)
        .await
        .with_context(|| format!("failed to listen for viewers on {addr}"))?;
    eprintln!("monitor.io: telnet localhost {}", config.port);
    tokio::spawn(async move {
        if let Err(e) = viewers.run().await {
            tracing::error!(error = %e, "Viewer listener stopped");
        }
    });
    app.run_remote(sessions_rx, size).await
}

/// Logs go to `log_file` when given; otherwise stderr in remote mode and
/// nowhere in local mode, where the dashboard owns the terminal.
fn init_logging(log_file: Option<&Path>, remote: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("monitor_core=info,monitor_tui=info,monitor_io=info"));

    match log_file {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .with(filter)
                .init();
        }
        None if remote => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .with_writer(io::stderr),
                )
                .with(filter)
                .init();
        }
        None => {}
    }
    Ok(())
}
