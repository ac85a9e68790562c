//! Heartbeat and timeout policy (§4.6 "Heartbeat").
//!
//! The session loop owns the clock; this module is pure policy so it can
//! be unit tested without spinning up a tokio runtime.

use std::time::{Duration, Instant};

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(3);
pub const CLIENT_TIMEOUT_SECS: f32 = 10.0;

/// Tracks when the server last emitted a heartbeat frame, independent of
/// any one client's `lastHeartbeat`.
pub struct HeartbeatClock {
    last_sent: Instant,
}

impl HeartbeatClock {
    pub fn new(now: Instant) -> Self {
        Self { last_sent: now }
    }

    /// Returns true (and resets the clock) if a server heartbeat is due.
    pub fn due(&mut self, now: Instant) -> bool {
        if now.duration_since(self.last_sent) >= HEARTBEAT_INTERVAL {
            self.last_sent = now;
            true
        } else {
            false
        }
    }
}
