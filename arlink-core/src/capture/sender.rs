//! Per-frame capture state machine.
//!
//! One [`FrameCaptureSender`] is driven by an external frame clock:
//!
//! ```text
//!            on_frame_start(now)                on_render_boundary()
//!   Idle ───────────────────────► Armed ───────────────────────────► Capturing ──► Idle
//!    ▲   gate closed: stay Idle     (waits for the frame to finish)   blit, encode, send
//!    └───────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every frame start also re-tracks the display size so the capture
//! buffer follows a resize immediately, whether or not that frame is
//! sent. A rejected frame costs one size computation and one gate check.

use std::time::Instant;

use tracing::{debug, info, trace, warn};

use crate::capture::bandwidth::BandwidthEstimator;
use crate::capture::buffer::{BufferHandle, FrameBufferCache};
use crate::capture::decoder::{DecodedFrame, FrameDecoder};
use crate::capture::encoder::FrameEncoder;
use crate::capture::resolution::ResolutionTracker;
use crate::capture::surface::RenderSurface;
use crate::capture::throttle::Throttler;
use crate::capture::types::Resolution;
use crate::error::ArlinkError;
use crate::message::{ControlMessage, FrameMessage, MAX_FRAME_DATA, Message};
use crate::network::transport::{MessageTag, Transport};

// ── CaptureConfig ────────────────────────────────────────────────

/// Settings validated once, before the loop may start.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Upper bound on frames sent per second.
    pub max_fps: f64,
    /// Capture resolution relative to the display, in `(0, 1]`.
    pub resolution_scale: f64,
    /// Decode every sent frame locally and keep the result.
    pub debug_preview: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_fps: 30.0,
            resolution_scale: 0.5,
            debug_preview: false,
        }
    }
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<(), ArlinkError> {
        Throttler::new(self.max_fps)?;
        ResolutionTracker::new(self.resolution_scale)?;
        Ok(())
    }
}

// ── State / outcome ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Waiting for the gate.
    Idle,
    /// Gate passed at `gate_time`; waiting for the render boundary.
    ArmedForCapture { gate_time: Instant },
    /// Reading back, encoding and enqueueing.
    Capturing,
}

/// What happened at a render boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Nothing was armed for this frame.
    Idle,
    /// A frame was enqueued on the transport.
    Sent {
        tag: MessageTag,
        sequence: u64,
        bytes: usize,
        resolution: Resolution,
    },
    /// The display had zero area.
    SkippedDegenerate,
    /// Read-back or encoding failed; the frame was dropped.
    Dropped,
}

impl FrameOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

/// Running counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SenderStats {
    pub frames_sent: u64,
    /// Frame starts the gate turned away.
    pub frames_rejected: u64,
    /// Armed frames skipped because the display had zero area.
    pub frames_skipped: u64,
    /// Armed frames lost to capture or encode failures.
    pub frames_dropped: u64,
    pub bytes_sent: u64,
    pub buffer_allocations: u64,
    /// Outbound throughput over the last second.
    pub estimated_bps: u64,
    /// Frame rate achieved over the last second.
    pub achieved_fps: f64,
}

// ── FrameCaptureSender ───────────────────────────────────────────

pub struct FrameCaptureSender<S, E, T> {
    config: CaptureConfig,
    throttler: Throttler,
    tracker: ResolutionTracker,
    cache: FrameBufferCache,
    surface: S,
    encoder: E,
    transport: T,
    decoder: Option<FrameDecoder>,
    preview: Option<DecodedFrame>,
    state: CaptureState,
    accepting: bool,
    sequence: u64,
    stats: SenderStats,
    bandwidth: BandwidthEstimator,
}

impl<S, E, T> FrameCaptureSender<S, E, T>
where
    S: RenderSurface,
    E: FrameEncoder,
    T: Transport,
{
    /// Fails with [`ArlinkError::Configuration`] if `config` is invalid.
    pub fn new(config: CaptureConfig, surface: S, encoder: E, transport: T) -> Result<Self, ArlinkError> {
        let throttler = Throttler::new(config.max_fps)?;
        let tracker = ResolutionTracker::new(config.resolution_scale)?;
        let decoder = config.debug_preview.then(FrameDecoder::new);

        Ok(Self {
            config,
            throttler,
            tracker,
            cache: FrameBufferCache::new(),
            surface,
            encoder,
            transport,
            decoder,
            preview: None,
            state: CaptureState::Idle,
            accepting: true,
            sequence: 0,
            stats: SenderStats::default(),
            bandwidth: BandwidthEstimator::new(),
        })
    }

    /// Announce the session to the peer.
    pub fn send_hello(&self) -> MessageTag {
        self.transport.send(Message::Control(ControlMessage::hello(
            self.encoder.image_format(),
            self.config.max_fps,
        )))
    }

    /// Start of a display frame. Returns `true` if the frame is armed
    /// for capture at its render boundary.
    pub fn on_frame_start(&mut self, now: Instant) -> bool {
        if !self.accepting {
            return false;
        }

        self.track_resolution();

        match self.state {
            CaptureState::Idle => {
                if self.throttler.can_send(now) {
                    self.state = CaptureState::ArmedForCapture { gate_time: now };
                    true
                } else {
                    self.stats.frames_rejected += 1;
                    false
                }
            }
            // Boundary not signalled yet; keep the first gate time.
            CaptureState::ArmedForCapture { .. } => true,
            CaptureState::Capturing => false,
        }
    }

    /// The current frame's rendering is complete.
    pub fn on_render_boundary(&mut self) -> FrameOutcome {
        let CaptureState::ArmedForCapture { gate_time } = self.state else {
            return FrameOutcome::Idle;
        };

        self.state = CaptureState::Capturing;
        let outcome = self.capture(gate_time);
        self.state = CaptureState::Idle;
        outcome
    }

    /// One whole display frame: frame start, render pass, render boundary.
    pub fn tick(&mut self, now: Instant) -> FrameOutcome {
        self.on_frame_start(now);
        self.surface.render_pass();
        self.on_render_boundary()
    }

    /// Stop accepting frames, send `Goodbye`, and wait until everything
    /// enqueued so far has been handed to the network. The capture buffer
    /// is released even if the flush fails.
    pub async fn shutdown(&mut self) -> Result<(), ArlinkError> {
        self.accepting = false;
        self.state = CaptureState::Idle;

        let tag = self.transport.send(Message::Control(ControlMessage::Goodbye));
        let flushed = self.transport.flush_and_wait(tag).await;
        self.cache.release();

        match &flushed {
            Ok(()) => info!(
                "capture sender stopped after {} frames ({} bytes)",
                self.stats.frames_sent, self.stats.bytes_sent
            ),
            Err(e) => warn!("final flush failed: {e}"),
        }
        flushed
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    pub fn stats(&self) -> SenderStats {
        SenderStats {
            buffer_allocations: self.cache.allocations(),
            estimated_bps: self.bandwidth.estimate_bps(),
            achieved_fps: self.bandwidth.estimate_fps(),
            ..self.stats.clone()
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Handle of the current capture buffer.
    pub fn buffer_handle(&self) -> Option<BufferHandle> {
        self.cache.current()
    }

    pub fn throttler(&self) -> &Throttler {
        &self.throttler
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Last locally decoded frame when `debug_preview` is on.
    pub fn preview(&self) -> Option<&DecodedFrame> {
        self.preview.as_ref()
    }

    // ── Internal ─────────────────────────────────────────────────

    fn track_resolution(&mut self) -> Option<Resolution> {
        let resolution = self.tracker.compute(self.surface.size());
        if resolution.is_empty() {
            return None;
        }
        self.cache
            .ensure(resolution.width, resolution.height, self.encoder.capture_format());
        Some(resolution)
    }

    fn capture(&mut self, gate_time: Instant) -> FrameOutcome {
        let Some(resolution) = self.track_resolution() else {
            trace!("display has zero area; skipping capture");
            self.stats.frames_skipped += 1;
            return FrameOutcome::SkippedDegenerate;
        };

        let data = match self.read_and_encode() {
            Ok(data) => data,
            Err(e) => {
                warn!("dropping frame {}: {e}", self.sequence);
                self.stats.frames_dropped += 1;
                return FrameOutcome::Dropped;
            }
        };

        let pixel_format = self.encoder.capture_format();
        if let Some(decoder) = &self.decoder {
            match decoder.decode(self.encoder.image_format(), &data, resolution, pixel_format) {
                Ok(frame) => {
                    debug!("preview {} decoded ({} bytes)", frame.resolution, frame.data.len());
                    self.preview = Some(frame);
                }
                Err(e) => warn!("preview of frame {} failed: {e}", self.sequence),
            }
        }

        let sequence = self.sequence;
        let bytes = data.len();
        let tag = self.transport.send(Message::Frame(FrameMessage {
            sequence,
            width: resolution.width,
            height: resolution.height,
            image_format: self.encoder.image_format(),
            pixel_format,
            data,
        }));

        self.sequence += 1;
        self.throttler.record_send(gate_time);
        self.bandwidth.record_at(gate_time, bytes as u64);
        self.stats.frames_sent += 1;
        self.stats.bytes_sent += bytes as u64;
        trace!("frame {sequence} {resolution} enqueued as {tag} ({bytes} bytes)");

        FrameOutcome::Sent {
            tag,
            sequence,
            bytes,
            resolution,
        }
    }

    fn read_and_encode(&mut self) -> Result<Vec<u8>, ArlinkError> {
        let buffer = self
            .cache
            .buffer_mut()
            .ok_or_else(|| ArlinkError::Capture("no capture buffer".into()))?;
        self.surface.read_pixels(buffer)?;
        let data = self
            .encoder
            .encode(buffer.data(), buffer.width(), buffer.height(), buffer.format())?;
        if data.is_empty() {
            return Err(ArlinkError::Encode("codec returned no data".into()));
        }
        // Anything larger would be lost inside `Transport::send`.
        if data.len() > MAX_FRAME_DATA {
            return Err(ArlinkError::Encode(format!(
                "encoded frame is {} bytes, packet limit leaves {MAX_FRAME_DATA}",
                data.len()
            )));
        }
        Ok(data)
    }
}

// ── Tests ────────────────────────────────────────────────────────
