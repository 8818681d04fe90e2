//! Configuration
//!
//! Settings are resolved with the following priority (highest first):
//! 1. CLI arguments (applied by the binary after loading)
//! 2. Environment variables (`MONITOR_IO_*`)
//! 3. TOML configuration file
//! 4. Default values
//!
//! The file lives at `$XDG_CONFIG_HOME/monitor-io/monitor.toml` unless a
//! path is given explicitly.
//!
//! # Example Configuration
//!
//! ```toml
//! [display]
//! width = 120
//! height = 40
//! negative_scroll = "clamp"
//!
//! [remote]
//! enabled = true
//! port = 1337
//! local_only = true
//!
//! [sockets]
//! listen = "0.0.0.0:7331"
//!
//! [latency]
//! enabled = true
//! time_between_echoes_ms = 500
//!
//! [timing]
//! tick_interval_ms = 1000
//! emit_display_ms = 2000
//! reap_grace_ms = 0
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::viewport::NegativeScrollPolicy;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[display]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayToml {
    /// Fallback width in columns
    pub width: Option<u16>,
    /// Fallback height in rows
    pub height: Option<u16>,
    /// `clamp` or `abort`
    pub negative_scroll: Option<NegativeScrollPolicy>,
}

/// `[remote]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteToml {
    /// Serve the dashboard over telnet instead of the local terminal
    pub enabled: Option<bool>,
    /// Viewer port
    pub port: Option<u16>,
    /// Only accept viewers from loopback
    pub local_only: Option<bool>,
}

/// `[sockets]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketsToml {
    /// Listen address for monitored sockets
    pub listen: Option<SocketAddr>,
}

/// `[latency]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyToml {
    /// Probe each socket's round-trip time
    pub enabled: Option<bool>,
    /// Delay between a reply and the next probe
    pub time_between_echoes_ms: Option<u64>,
}

/// `[timing]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingToml {
    /// Reap-and-repaint period
    pub tick_interval_ms: Option<u64>,
    /// How long the dispatch summary stays on screen
    pub emit_display_ms: Option<u64>,
    /// Minimum time a disconnected row stays visible
    pub reap_grace_ms: Option<u64>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorToml {
    /// Display section
    pub display: DisplayToml,
    /// Remote viewer section
    pub remote: RemoteToml,
    /// Monitored socket section
    pub sockets: SocketsToml,
    /// Latency probe section
    pub latency: LatencyToml,
    /// Timing section
    pub timing: TimingToml,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Resolved settings for one dashboard instance
#[derive(Clone, Debug, PartialEq)]
pub struct MonitorConfig {
    /// Fallback width (remote mode, or a terminal that cannot report size)
    pub width: u16,
    /// Fallback height
    pub height: u16,
    /// Serve over telnet instead of the local terminal
    pub remote: bool,
    /// Remote viewer port
    pub port: u16,
    /// Only accept remote viewers from loopback
    pub local_only: bool,
    /// Probe latency
    pub test_latency: bool,
    /// Delay between an echo reply and the next probe
    pub time_between_echoes: Duration,
    /// Where monitored sockets connect
    pub listen: SocketAddr,
    /// Reap-and-repaint period
    pub tick_interval: Duration,
    /// How long the dispatch summary stays on screen
    pub emit_display: Duration,
    /// Minimum time a disconnected row stays visible
    pub reap_grace: Duration,
    /// What to do when vertical scroll goes negative
    pub negative_scroll: NegativeScrollPolicy,
    /// Config file that was loaded, if any
    pub config_file_path: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 40,
            remote: false,
            port: 1337,
            local_only: false,
            test_latency: false,
            time_between_echoes: Duration::from_millis(500),
            listen: SocketAddr::from(([127, 0, 0, 1], 7331)),
            tick_interval: Duration::from_millis(1000),
            emit_display: Duration::from_millis(2000),
            reap_grace: Duration::ZERO,
            negative_scroll: NegativeScrollPolicy::Clamp,
            config_file_path: None,
        }
    }
}

impl MonitorConfig {
    /// Check values that would make the dashboard unusable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::ValidationError(format!(
                "terminal size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "tick interval must be non-zero".to_string(),
            ));
        }
        if self.remote && self.port == 0 {
            return Err(ConfigError::ValidationError(
                "remote mode needs a non-zero port".to_string(),
            ));
        }
        Ok(())
    }

    fn apply_toml(&mut self, toml: &MonitorToml) {
        if let Some(width) = toml.display.width {
            self.width = width;
        }
        if let Some(height) = toml.display.height {
            self.height = height;
        }
        if let Some(policy) = toml.display.negative_scroll {
            self.negative_scroll = policy;
        }

        if let Some(enabled) = toml.remote.enabled {
            self.remote = enabled;
        }
        if let Some(port) = toml.remote.port {
            self.port = port;
        }
        if let Some(local_only) = toml.remote.local_only {
            self.local_only = local_only;
        }

        if let Some(listen) = toml.sockets.listen {
            self.listen = listen;
        }

        if let Some(enabled) = toml.latency.enabled {
            self.test_latency = enabled;
        }
        if let Some(ms) = toml.latency.time_between_echoes_ms {
            self.time_between_echoes = Duration::from_millis(ms);
        }

        if let Some(ms) = toml.timing.tick_interval_ms {
            self.tick_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = toml.timing.emit_display_ms {
            self.emit_display = Duration::from_millis(ms);
        }
        if let Some(ms) = toml.timing.reap_grace_ms {
            self.reap_grace = Duration::from_millis(ms);
        }
    }

    /// Apply `MONITOR_IO_*` overrides from `lookup`. Unparseable values are
    /// logged and skipped.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fn flag(value: &str) -> bool {
            value != "0" && !value.eq_ignore_ascii_case("false")
        }

        fn parsed<T: std::str::FromStr>(key: &str, value: String) -> Option<T> {
            let result = value.parse().ok();
            if result.is_none() {
                tracing::warn!(key, value = %value, "Ignoring unparseable environment override");
            }
            result
        }

        if let Some(v) = lookup("MONITOR_IO_WIDTH").and_then(|v| parsed("MONITOR_IO_WIDTH", v)) {
            self.width = v;
        }
        if let Some(v) = lookup("MONITOR_IO_HEIGHT").and_then(|v| parsed("MONITOR_IO_HEIGHT", v)) {
            self.height = v;
        }
        if let Some(v) = lookup("MONITOR_IO_REMOTE") {
            self.remote = flag(&v);
        }
        if let Some(v) = lookup("MONITOR_IO_PORT").and_then(|v| parsed("MONITOR_IO_PORT", v)) {
            self.port = v;
        }
        if let Some(v) = lookup("MONITOR_IO_LOCAL_ONLY") {
            self.local_only = flag(&v);
        }
        if let Some(v) = lookup("MONITOR_IO_TEST_LATENCY") {
            self.test_latency = flag(&v);
        }
        if let Some(ms) = lookup("MONITOR_IO_ECHO_INTERVAL_MS")
            .and_then(|v| parsed::<u64>("MONITOR_IO_ECHO_INTERVAL_MS", v))
        {
            self.time_between_echoes = Duration::from_millis(ms);
        }
        if let Some(v) = lookup("MONITOR_IO_LISTEN").and_then(|v| parsed("MONITOR_IO_LISTEN", v)) {
            self.listen = v;
        }
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Default configuration file path
///
/// `$XDG_CONFIG_HOME/monitor-io/monitor.toml`, typically
/// `~/.config/monitor-io/monitor.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("monitor-io").join("monitor.toml"))
}

/// Load from the default path and the process environment
pub fn load_config() -> Result<MonitorConfig, ConfigError> {
    load_config_from_path(default_config_path().as_deref())
}

/// Load from a specific file and the process environment
///
/// A missing file is not an error; defaults are used.
pub fn load_config_from_path(path: Option<&Path>) -> Result<MonitorConfig, ConfigError> {
    let mut config = load_file(path)?;
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

fn load_file(path: Option<&Path>) -> Result<MonitorConfig, ConfigError> {
    let mut config = MonitorConfig::default();

    let Some(path) = path else {
        return Ok(config);
    };

    if !path.exists() {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        return Ok(config);
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    let toml: MonitorToml = toml::from_str(&content)?;
    config.apply_toml(&toml);
    config.config_file_path = Some(path.to_path_buf());

    tracing::info!(path = %path.display(), "Loaded configuration from file");
    Ok(config)
}
