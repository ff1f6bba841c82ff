//! Async driver for [`FrameCaptureSender`].
//!
//! Produces the display frame clock on a Tokio task:
//!
//! 1. Interval tick → `on_frame_start(now)` (resize tracking + gate).
//! 2. The surface renders the frame.
//! 3. Render boundary → capture, encode and enqueue if armed.
//!
//! When the stop flag is cleared the loop exits and the sender is shut
//! down, which flushes the transport before `run` returns.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::capture::encoder::FrameEncoder;
use crate::capture::sender::{FrameCaptureSender, SenderStats};
use crate::capture::surface::RenderSurface;
use crate::error::ArlinkError;
use crate::network::transport::Transport;

/// How often running statistics are logged.
const STATS_INTERVAL: Duration = Duration::from_secs(5);

pub struct CaptureService<S, E, T> {
    sender: FrameCaptureSender<S, E, T>,
    frame_interval: Duration,
    running: Arc<AtomicBool>,
}

impl<S, E, T> CaptureService<S, E, T>
where
    S: RenderSurface + Send,
    E: FrameEncoder,
    T: Transport,
{
    /// Drive `sender` at `display_fps` frames per second.
    pub fn new(sender: FrameCaptureSender<S, E, T>, display_fps: f64) -> Result<Self, ArlinkError> {
        if !display_fps.is_finite() || display_fps <= 0.0 {
            return Err(ArlinkError::Configuration(format!(
                "display refresh rate must be positive, got {display_fps}"
            )));
        }
        Ok(Self {
            sender,
            frame_interval: Duration::from_secs_f64(1.0 / display_fps),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// A cloneable handle; storing `false` stops the loop.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn sender(&self) -> &FrameCaptureSender<S, E, T> {
        &self.sender
    }

    pub fn sender_mut(&mut self) -> &mut FrameCaptureSender<S, E, T> {
        &mut self.sender
    }

    /// Run the frame loop until stopped, then flush and return the final
    /// statistics.
    pub async fn run(&mut self) -> Result<SenderStats, ArlinkError> {
        let mut ticker = tokio::time::interval(self.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.sender.send_hello();
        info!(
            "capture loop started: display {:.1} Hz, max {} fps, scale {}",
            1.0 / self.frame_interval.as_secs_f64(),
            self.sender.config().max_fps,
            self.sender.config().resolution_scale
        );

        let mut last_report = Instant::now();
        while self.running.load(Ordering::SeqCst) {
            ticker.tick().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            self.sender.on_frame_start(Instant::now());
            self.sender.surface_mut().render_pass();
            self.sender.on_render_boundary();

            if last_report.elapsed() >= STATS_INTERVAL {
                let stats = self.sender.stats();
                debug!(
                    "sent {} frames, {} rejected, {} dropped, {:.1} fps, {} B/s",
                    stats.frames_sent,
                    stats.frames_rejected,
                    stats.frames_dropped,
                    stats.achieved_fps,
                    stats.estimated_bps
                );
                last_report = Instant::now();
            }
        }

        self.sender.shutdown().await?;
        Ok(self.sender.stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::encoder::ZstdEncoder;
    use crate::capture::sender::CaptureConfig;
    use crate::capture::surface::SoftwareSurface;
    use crate::message::{ControlMessage, Message};
    use crate::network::loopback::LoopbackTransport;

    fn service(
        max_fps: f64,
        display_fps: f64,
    ) -> (
        CaptureService<SoftwareSurface, ZstdEncoder, LoopbackTransport>,
        tokio::sync::mpsc::UnboundedReceiver<(crate::network::MessageTag, Message)>,
    ) {
        let (transport, rx) = LoopbackTransport::new();
        let sender = FrameCaptureSender::new(
            CaptureConfig {
                max_fps,
                resolution_scale: 0.5,
                debug_preview: false,
            },
            SoftwareSurface::new(64, 48),
            ZstdEncoder::new(1),
            transport,
        )
        .unwrap();
        (CaptureService::new(sender, display_fps).unwrap(), rx)
    }

    #[test]
    fn rejects_bad_display_rate() {
        let (transport, _rx) = LoopbackTransport::new();
        let sender = FrameCaptureSender::new(
            CaptureConfig::default(),
            SoftwareSurface::new(8, 8),
            ZstdEncoder::new(1),
            transport,
        )
        .unwrap();
        assert!(CaptureService::new(sender, 0.0).is_err());
    }

    #[tokio::test]
    async fn runs_until_stopped_then_says_goodbye() {
        let (mut svc, mut rx) = service(20.0, 100.0);
        let stop = svc.stop_handle();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            stop.store(false, Ordering::SeqCst);
        });

        let stats = svc.run().await.unwrap();
        assert!(!svc.is_running());
        assert!(stats.frames_sent >= 2, "sent {}", stats.frames_sent);
        // 20 fps over ~300 ms leaves headroom for scheduler jitter.
        assert!(stats.frames_sent <= 8, "sent {}", stats.frames_sent);

        let mut messages = Vec::new();
        while let Ok((_, msg)) = rx.try_recv() {
            messages.push(msg);
        }
        assert!(matches!(
            messages.first(),
            Some(Message::Control(ControlMessage::Hello { .. }))
        ));
        assert_eq!(
            messages.last(),
            Some(&Message::Control(ControlMessage::Goodbye))
        );
        let frames = messages
            .iter()
            .filter(|m| matches!(m, Message::Frame(_)))
            .count() as u64;
        assert_eq!(frames, stats.frames_sent);
    }

    #[tokio::test]
    async fn stopped_before_start_sends_no_frames() {
        let (mut svc, _rx) = service(30.0, 60.0);
        svc.stop();
        let stats = svc.run().await.unwrap();
        assert_eq!(stats.frames_sent, 0);
    }
}
