//! # arlink-core
//!
//! Streams a locally rendered view (an editor game view) to a device
//! over the network, one throttled, downscaled, encoded frame at a time.
//!
//! This crate contains:
//! - **Capture**: `Throttler`, `ResolutionTracker`, `FrameBufferCache`, the
//!   `FrameCaptureSender` state machine and its Tokio driver `CaptureService`
//! - **Codecs**: `JpegEncoder`, `ZstdEncoder`, `FrameDecoder`
//! - **Protocol**: `PacketHeader`, `Packet`, `Message`, `PacketFlags`
//! - **Codec**: `PacketCodec` for framed TCP I/O via `tokio_util`
//! - **Network**: the `Transport` seam, TCP `Connection`, `LoopbackTransport`
//! - **Error**: `ArlinkError`, a `thiserror`-based error enum

pub mod capture;
pub mod codec;
pub mod error;
pub mod flags;
pub mod header;
pub mod message;
pub mod network;
pub mod packet;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use capture::{
    CaptureConfig, CaptureService, CaptureState, FrameCaptureSender, FrameDecoder, FrameEncoder,
    FrameOutcome, FrameReceiver, JpegEncoder, PixelFormat, ReceiverEvent, RenderSurface,
    Resolution, SenderStats, SoftwareSurface, Throttler, ZstdEncoder,
};
pub use codec::PacketCodec;
pub use error::ArlinkError;
pub use flags::PacketFlags;
pub use header::{HEADER_SIZE, PacketHeader};
pub use message::{
    ControlMessage, FrameMessage, ImageFormat, MAX_FRAME_DATA, Message, MessageKind,
};
pub use network::{Connection, ConnectionInfo, ConnectionSender, LoopbackTransport, MessageTag, Transport};
pub use packet::{MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE, Packet};
