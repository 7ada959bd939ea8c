//! Connection Heartbeat
//!
//! Tracks liveness of a single WebSocket connection. The connection task
//! pings on every tick; any inbound frame counts as a pong. A connection
//! that stays silent for longer than the pong timeout while a ping is
//! outstanding is considered dead.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Configuration for heartbeat behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Interval between ping frames.
    pub ping_interval: Duration,
    /// Silence tolerated while a ping is outstanding.
    pub pong_timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), Duration::from_secs(60))
    }
}

impl HeartbeatConfig {
    /// Create a new configuration with custom values.
    #[must_use]
    pub const fn new(ping_interval: Duration, pong_timeout: Duration) -> Self {
        Self {
            ping_interval,
            pong_timeout,
        }
    }
}

/// What the connection should do after a heartbeat tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    /// Send a ping frame.
    Ping,
    /// The peer has been silent too long; drop the connection.
    Expired(Duration),
}

/// Liveness state of one connection.
#[derive(Debug)]
pub struct Heartbeat {
    config: HeartbeatConfig,
    last_seen: Instant,
    awaiting_pong: bool,
}

impl Heartbeat {
    /// Start tracking a freshly opened connection.
    #[must_use]
    pub fn new(config: HeartbeatConfig) -> Self {
        Self {
            config,
            last_seen: Instant::now(),
            awaiting_pong: false,
        }
    }

    /// Tick source for this heartbeat. The first tick fires one interval
    /// after the call.
    #[must_use]
    pub fn interval(&self) -> Interval {
        let period = self.config.ping_interval;
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    }

    /// Record any inbound frame.
    pub fn record_activity(&mut self) {
        self.last_seen = Instant::now();
        self.awaiting_pong = false;
    }

    /// Whether a ping is outstanding.
    #[must_use]
    pub const fn is_awaiting_pong(&self) -> bool {
        self.awaiting_pong
    }

    /// Time since the last inbound frame.
    #[must_use]
    pub fn silence(&self) -> Duration {
        self.last_seen.elapsed()
    }

    /// Decide what to do on a tick.
    pub fn on_tick(&mut self) -> HeartbeatAction {
        let silence = self.silence();
        if self.awaiting_pong && silence > self.config.pong_timeout {
            return HeartbeatAction::Expired(silence);
        }
        self.awaiting_pong = true;
        HeartbeatAction::Ping
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HeartbeatConfig {
        HeartbeatConfig::new(Duration::from_secs(30), Duration::from_secs(60))
    }

    #[test]
    fn default_matches_settings() {
        assert_eq!(HeartbeatConfig::default(), config());
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_pings() {
        let mut heartbeat = Heartbeat::new(config());
        assert!(!heartbeat.is_awaiting_pong());
        assert_eq!(heartbeat.on_tick(), HeartbeatAction::Ping);
        assert!(heartbeat.is_awaiting_pong());
    }

    #[tokio::test(start_paused = true)]
    async fn activity_clears_outstanding_ping() {
        let mut heartbeat = Heartbeat::new(config());
        heartbeat.on_tick();
        tokio::time::advance(Duration::from_secs(45)).await;
        heartbeat.record_activity();
        assert!(!heartbeat.is_awaiting_pong());
        assert_eq!(heartbeat.silence(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn expires_after_silence_with_outstanding_ping() {
        let mut heartbeat = Heartbeat::new(config());
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(heartbeat.on_tick(), HeartbeatAction::Ping);
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(heartbeat.on_tick(), HeartbeatAction::Ping);
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(
            heartbeat.on_tick(),
            HeartbeatAction::Expired(Duration::from_secs(90))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn silence_without_ping_does_not_expire() {
        let mut heartbeat = Heartbeat::new(config());
        tokio::time::advance(Duration::from_secs(600)).await;
        assert_eq!(heartbeat.on_tick(), HeartbeatAction::Ping);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_waits_one_period() {
        let heartbeat = Heartbeat::new(config());
        let mut interval = heartbeat.interval();
        let start = Instant::now();
        interval.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }
}
