//! Outbound rate limiting.
//!
//! The referee bot silently drops messages sent faster than roughly two per
//! second, so every write goes through a `PaceGate` first. This is a
//! load-bearing piece of the transport, not an incidental `sleep` sprinkled
//! at call sites — keeping it as its own type means the interval is defined
//! once and is swappable in tests.

use std::time::Duration;

use tokio::time::{Instant, sleep_until};

/// Minimum spacing between two outbound lines.
pub const MIN_SEND_INTERVAL: Duration = Duration::from_millis(500);

/// Tracks the last send time and delays the next one so sends never land
/// closer together than [`MIN_SEND_INTERVAL`].
pub struct PaceGate {
    interval: Duration,
    last_sent: Option<Instant>,
}

impl PaceGate {
    pub fn new() -> Self {
        Self::with_interval(MIN_SEND_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            last_sent: None,
        }
    }

    /// Block until it is safe to send, then record the send time.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last_sent {
            let earliest = last + self.interval;
            sleep_until(earliest).await;
        }
        self.last_sent = Some(Instant::now());
    }
}

impl Default for PaceGate {
    fn default() -> Self {
        Self::new()
    }
}
