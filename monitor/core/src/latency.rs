//! Latency Probing
//!
//! When enabled, each socket is sent `_echo` with the current wall-clock
//! time in epoch milliseconds. The socket echoes the value back, and the
//! difference is its round-trip time. The next probe is scheduled only after
//! a reply arrives, so there is never more than one probe in flight per
//! socket.
//!
//! # Protocol
//!
//! ```text
//! dashboard ── {"name":"_echo","data":1700000000000} ──► socket
//! dashboard ◄── {"name":"_echo","data":1700000000000} ── socket
//!           latency = now - 1700000000000
//!           ... time_between_echoes later, probe again
//! ```

use std::collections::HashSet;
use std::time::Duration;

use serde_json::Value;

use crate::transport::ConnectionId;

/// Latency below this is shown as good
pub const GOOD_LATENCY: Duration = Duration::from_millis(100);

/// Latency below this (and not good) is shown as fair
pub const FAIR_LATENCY: Duration = Duration::from_millis(500);

/// Current wall-clock time in epoch milliseconds
#[must_use]
pub fn epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Display band for a latency measurement
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LatencyBand {
    /// Under 100 ms
    Good,
    /// Under 500 ms
    Fair,
    /// 500 ms or more
    Poor,
}

impl LatencyBand {
    /// Band for a measurement
    #[must_use]
    pub fn classify(latency: Duration) -> Self {
        if latency < GOOD_LATENCY {
            Self::Good
        } else if latency < FAIR_LATENCY {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

/// Probe settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Whether probing runs at all
    pub enabled: bool,
    /// Delay between a reply and the next probe
    pub interval: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: Duration::from_millis(500),
        }
    }
}

impl ProbeConfig {
    /// Probing on, with the given interval
    #[must_use]
    pub fn enabled(interval: Duration) -> Self {
        Self {
            enabled: true,
            interval,
        }
    }

    /// Probing off
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }
}

/// Tracks which sockets have a probe in flight
#[derive(Debug, Default)]
pub struct LatencyProber {
    config: ProbeConfig,
    in_flight: HashSet<ConnectionId>,
}

impl LatencyProber {
    /// Create a prober
    #[must_use]
    pub fn new(config: ProbeConfig) -> Self {
        Self {
            config,
            in_flight: HashSet::new(),
        }
    }

    /// Delay between a reply and the next probe
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Start a probe for `id`, returning the payload to send.
    ///
    /// `None` when probing is off or a probe is already in flight.
    pub fn start(&mut self, id: ConnectionId, now_ms: i64) -> Option<Value> {
        if !self.config.enabled || !self.in_flight.insert(id) {
            return None;
        }
        Some(Value::from(now_ms))
    }

    /// Complete the in-flight probe for `id` with its echoed payload.
    ///
    /// Unsolicited or malformed replies yield `None`.
    pub fn complete(&mut self, id: ConnectionId, reply: &Value, now_ms: i64) -> Option<Duration> {
        if !self.in_flight.contains(&id) {
            tracing::debug!(connection_id = %id, "Ignoring unsolicited echo");
            return None;
        }
        let Some(sent_ms) = reply.as_i64() else {
            tracing::debug!(connection_id = %id, reply = %reply, "Ignoring malformed echo");
            return None;
        };
        self.in_flight.remove(&id);
        let elapsed = u64::try_from(now_ms.saturating_sub(sent_ms)).unwrap_or(0);
        Some(Duration::from_millis(elapsed))
    }

    /// Stop tracking a departed socket
    pub fn forget(&mut self, id: ConnectionId) {
        self.in_flight.remove(&id);
    }

    /// Number of probes awaiting a reply
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_band_thresholds() {
        assert_eq!(LatencyBand::classify(Duration::from_millis(0)), LatencyBand::Good);
        assert_eq!(LatencyBand::classify(Duration::from_millis(99)), LatencyBand::Good);
        assert_eq!(LatencyBand::classify(Duration::from_millis(100)), LatencyBand::Fair);
        assert_eq!(LatencyBand::classify(Duration::from_millis(499)), LatencyBand::Fair);
        assert_eq!(LatencyBand::classify(Duration::from_millis(500)), LatencyBand::Poor);
    }

    #[test]
    fn test_disabled_prober_never_starts() {
        let mut prober = LatencyProber::new(ProbeConfig::disabled());
        assert!(prober.start(ConnectionId::from_raw(1), 0).is_none());
    }

    #[test]
    fn test_one_probe_in_flight_per_socket() {
        let mut prober = LatencyProber::new(ProbeConfig::enabled(Duration::from_millis(500)));
        let id = ConnectionId::from_raw(1);

        assert_eq!(prober.start(id, 1_000), Some(json!(1_000)));
        assert!(prober.start(id, 1_010).is_none());
        assert_eq!(prober.in_flight(), 1);

        assert_eq!(
            prober.complete(id, &json!(1_000), 1_042),
            Some(Duration::from_millis(42))
        );
        assert_eq!(prober.in_flight(), 0);
        assert!(prober.start(id, 2_000).is_some());
    }

    #[test]
    fn test_unsolicited_and_malformed_replies() {
        let mut prober = LatencyProber::new(ProbeConfig::enabled(Duration::from_millis(500)));
        let id = ConnectionId::from_raw(1);

        assert!(prober.complete(id, &json!(5), 10).is_none());

        prober.start(id, 100);
        assert!(prober.complete(id, &json!("soon"), 150).is_none());
        assert_eq!(prober.in_flight(), 1);
    }

    #[test]
    fn test_clock_skew_saturates_at_zero() {
        let mut prober = LatencyProber::new(ProbeConfig::enabled(Duration::from_millis(500)));
        let id = ConnectionId::from_raw(1);
        prober.start(id, 100);
        assert_eq!(prober.complete(id, &json!(200), 150), Some(Duration::ZERO));
    }

    #[test]
    fn test_forget_clears_in_flight() {
        let mut prober = LatencyProber::new(ProbeConfig::enabled(Duration::from_millis(500)));
        let id = ConnectionId::from_raw(1);
        prober.start(id, 100);
        prober.forget(id);
        assert_eq!(prober.in_flight(), 0);
    }

    #[test]
    fn test_epoch_millis_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(epoch_millis() > 1_577_836_800_000);
    }
}
