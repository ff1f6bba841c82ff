//! Outbound throughput for the sender's statistics.
//!
//! Keeps the frames enqueued during the last window and reports both the
//! byte rate and the achieved frame rate over that window.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct BandwidthEstimator {
    /// One entry per enqueued frame: `(gate time, encoded size)`.
    frames: VecDeque<(Instant, u64)>,
    window: Duration,
    bytes_in_window: u64,
}

impl BandwidthEstimator {
    /// One-second window.
    pub fn new() -> Self {
        Self::with_window(Duration::from_secs(1))
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            frames: VecDeque::new(),
            window,
            bytes_in_window: 0,
        }
    }

    /// A frame of `bytes` was enqueued at `when`. Times must not go
    /// backwards.
    pub fn record_at(&mut self, when: Instant, bytes: u64) {
        self.frames.push_back((when, bytes));
        self.bytes_in_window += bytes;

        let Some(cutoff) = when.checked_sub(self.window) else {
            return;
        };
        while self.frames.front().is_some_and(|&(at, _)| at < cutoff) {
            if let Some((_, old)) = self.frames.pop_front() {
                self.bytes_in_window -= old;
            }
        }
    }

    /// Bytes per second across the frames in the window. A single frame
    /// counts as having taken the whole window.
    pub fn estimate_bps(&self) -> u64 {
        match self.span() {
            Some(span) => (self.bytes_in_window as f64 / span.as_secs_f64()) as u64,
            None => 0,
        }
    }

    /// Frames per second actually achieved across the window.
    pub fn estimate_fps(&self) -> f64 {
        match (self.span(), self.frames.len()) {
            (Some(span), n) if n > 1 => (n - 1) as f64 / span.as_secs_f64(),
            _ => 0.0,
        }
    }

    pub fn sample_count(&self) -> usize {
        self.frames.len()
    }

    fn span(&self) -> Option<Duration> {
        let (first, _) = self.frames.front()?;
        let (last, _) = self.frames.back()?;
        let span = last.duration_since(*first);
        Some(if span.is_zero() { self.window } else { span })
    }
}

impl Default for BandwidthEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_recorded() {
        let est = BandwidthEstimator::new();
        assert_eq!(est.estimate_bps(), 0);
        assert_eq!(est.estimate_fps(), 0.0);
    }

    #[test]
    fn single_frame_spreads_over_window() {
        let mut est = BandwidthEstimator::with_window(Duration::from_secs(2));
        est.record_at(Instant::now(), 1000);
        assert_eq!(est.estimate_bps(), 500);
    }

    #[test]
    fn thirty_frames_per_second() {
        let mut est = BandwidthEstimator::new();
        let t0 = Instant::now();
        for i in 0..30u32 {
            est.record_at(t0 + Duration::from_millis(33) * i, 2000);
        }
        let fps = est.estimate_fps();
        assert!((29.0..=31.0).contains(&fps), "fps = {fps}");
        let bps = est.estimate_bps();
        assert!((58_000..=64_000).contains(&bps), "bps = {bps}");
    }

    #[test]
    fn drops_frames_older_than_window() {
        let mut est = BandwidthEstimator::with_window(Duration::from_millis(500));
        let t0 = Instant::now();
        est.record_at(t0, 1000);
        est.record_at(t0 + Duration::from_secs(1), 500);
        assert_eq!(est.sample_count(), 1);
        assert_eq!(est.estimate_bps(), 1000);
    }
}
