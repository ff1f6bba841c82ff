//! # Capture pipeline
//!
//! Captures the rendered view on a frame budget and ships it to the
//! device.
//!
//! ```text
//! EDITOR (sender)                                   DEVICE (receiver)
//! ┌───────────────────────────────┐                ┌──────────────────┐
//! │ CaptureService (frame clock)  │                │ FrameReceiver    │
//! │   ↓                           │                │   ↓              │
//! │ FrameCaptureSender            │                │ FrameDecoder     │
//! │   ├ Throttler (gate)          │   TCP packets  │                  │
//! │   ├ ResolutionTracker         │ ─────────────► │                  │
//! │   ├ FrameBufferCache          │                │                  │
//! │   ├ RenderSurface::read_pixels│                │                  │
//! │   ├ FrameEncoder              │                │                  │
//! │   └ Transport::send           │                │                  │
//! └───────────────────────────────┘                └──────────────────┘
//! ```
//!
//! | Module       | Purpose                                             |
//! |--------------|-----------------------------------------------------|
//! | `types`      | Pixel formats and resolutions                       |
//! | `throttle`   | Send-rate gate                                      |
//! | `resolution` | Downscaled capture size from the live display size  |
//! | `buffer`     | Reusable capture buffer                             |
//! | `surface`    | Render surfaces and the scaling blit                |
//! | `encoder`    | JPEG and zstd frame encoders                        |
//! | `decoder`    | Frame decoding for previews and receivers           |
//! | `bandwidth`  | Outbound throughput estimate                        |
//! | `sender`     | Per-frame capture state machine                     |
//! | `service`    | Tokio driver with stop handle and shutdown flush    |
//! | `receiver`   | Device-side consumer                                |

pub mod bandwidth;
pub mod buffer;
pub mod decoder;
pub mod encoder;
pub mod receiver;
pub mod resolution;
pub mod sender;
pub mod service;
pub mod surface;
pub mod throttle;
pub mod types;

// ── Re-exports ───────────────────────────────────────────────────

pub use bandwidth::BandwidthEstimator;
pub use buffer::{BufferHandle, FrameBuffer, FrameBufferCache};
pub use decoder::{DecodedFrame, FrameDecoder};
pub use encoder::{FrameEncoder, JpegEncoder, ZstdEncoder, encoder_for};
pub use receiver::{FrameReceiver, ReceiverEvent, ReceiverStats};
pub use resolution::{ResolutionTracker, compute_resolution};
pub use sender::{CaptureConfig, CaptureState, FrameCaptureSender, FrameOutcome, SenderStats};
pub use service::CaptureService;
pub use surface::{RenderSurface, SoftwareSurface, blit_scaled};
pub use throttle::Throttler;
pub use types::{PixelFormat, Resolution};
