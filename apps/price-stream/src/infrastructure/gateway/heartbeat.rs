//! Client Heartbeat
//!
//! Sends WebSocket ping frames at a fixed interval and declares a client
//! dead when nothing (data, ping or pong) has been heard from it for longer
//! than the timeout.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::infrastructure::config::GatewaySettings;

/// Configuration for heartbeat behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Interval between ping frames.
    pub ping_interval: Duration,
    /// Silence after which the client is considered dead.
    pub timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            timeout: Duration::from_secs(90),
        }
    }
}

impl From<&GatewaySettings> for HeartbeatConfig {
    fn from(settings: &GatewaySettings) -> Self {
        Self {
            ping_interval: settings.heartbeat_interval,
            timeout: settings.heartbeat_timeout,
        }
    }
}

/// What the socket task should do on a heartbeat tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatEvent {
    /// Send a ping frame.
    SendPing,
    /// Client has been silent too long; close the connection.
    Timeout,
}

/// Last time anything was received from the client.
///
/// Shared between the reader loop (records activity) and the writer task
/// (checks for expiry).
#[derive(Debug)]
pub struct HeartbeatState {
    last_seen: Mutex<Instant>,
}

impl Default for HeartbeatState {
    fn default() -> Self {
        Self::new()
    }
}

impl HeartbeatState {
    /// Start the silence clock now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_seen: Mutex::new(Instant::now()),
        }
    }

    /// Record inbound activity.
    pub fn record_activity(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    /// Time since the last inbound frame.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }
}

/// Per-connection heartbeat timer.
#[derive(Debug)]
pub struct Heartbeat {
    config: HeartbeatConfig,
    ticker: Interval,
}

impl Heartbeat {
    /// Create a heartbeat whose first tick is one interval from now.
    #[must_use]
    pub fn new(config: HeartbeatConfig) -> Self {
        let mut ticker =
            tokio::time::interval_at(Instant::now() + config.ping_interval, config.ping_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { config, ticker }
    }

    /// Wait for the next tick and decide what to do.
    pub async fn tick(&mut self, state: &HeartbeatState) -> HeartbeatEvent {
        self.ticker.tick().await;

        let idle = state.idle_for();
        if idle > self.config.timeout {
            tracing::debug!(
                idle_secs = idle.as_secs(),
                timeout_secs = self.config.timeout.as_secs(),
                "Heartbeat timeout detected"
            );
            HeartbeatEvent::Timeout
        } else {
            HeartbeatEvent::SendPing
        }
    }
}
