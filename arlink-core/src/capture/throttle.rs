//! Send-rate gate for non-critical messages.
//!
//! The gate only answers "may I send now?". Recording a send is a
//! separate call, made by the caller once the message was actually
//! enqueued, so a frame dropped for other reasons does not move the
//! window.

use std::time::{Duration, Instant};

use crate::error::ArlinkError;

#[derive(Debug, Clone)]
pub struct Throttler {
    target_fps: f64,
    interval: Duration,
    last_send: Option<Instant>,
}

impl Throttler {
    /// Create a gate allowing at most `target_fps` sends per second.
    pub fn new(target_fps: f64) -> Result<Self, ArlinkError> {
        if !target_fps.is_finite() || target_fps <= 0.0 {
            return Err(ArlinkError::Configuration(format!(
                "max_fps must be a positive number, got {target_fps}"
            )));
        }
        Ok(Self {
            target_fps,
            interval: Duration::from_secs_f64(1.0 / target_fps),
            last_send: None,
        })
    }

    /// Whether a send at `now` keeps approved sends `1/target_fps` apart.
    pub fn can_send(&self, now: Instant) -> bool {
        match self.last_send {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    /// Record that a send happened at `now`.
    pub fn record_send(&mut self, now: Instant) {
        self.last_send = Some(now);
    }

    /// Time left before the gate opens again (zero if already open).
    pub fn time_until_next(&self, now: Instant) -> Duration {
        match self.last_send {
            None => Duration::ZERO,
            Some(last) => self
                .interval
                .saturating_sub(now.saturating_duration_since(last)),
        }
    }

    pub fn target_fps(&self) -> f64 {
        self.target_fps
    }

    /// Minimum spacing between approved sends.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_send(&self) -> Option<Instant> {
        self.last_send
    }
}
