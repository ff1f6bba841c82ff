//! Domain-specific error types for the arlink pipeline.
//!
//! All fallible operations return `Result<T, ArlinkError>`.
//! Per-frame failures are recoverable; only configuration errors are fatal.

use thiserror::Error;

/// The canonical error type for arlink.
#[derive(Debug, Error)]
pub enum ArlinkError {
    // ── Configuration ────────────────────────────────────────────
    /// A capture setting is outside its valid range. Refuses to start.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    // ── Per-frame errors ─────────────────────────────────────────
    /// Reading pixels back from the render surface failed.
    #[error("capture failed: {0}")]
    Capture(String),

    /// The codec produced no data or reported an error.
    #[error("encode failed: {0}")]
    Encode(String),

    /// A compressed frame could not be decoded back to pixels.
    #[error("decode failed: {0}")]
    Decode(String),

    // ── Protocol Errors ──────────────────────────────────────────
    /// Received bytes that do not start with the `ARL0` magic.
    #[error("invalid magic bytes: expected ARL0")]
    InvalidMagic,

    /// The packet payload failed checksum verification.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} discriminant: {value:#x}")]
    UnknownVariant { type_name: &'static str, value: u64 },

    /// The payload exceeds the maximum packet size.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The received packet is shorter or longer than its header claims.
    #[error("invalid packet length: expected {expected}, got {actual}")]
    InvalidPacketLength { expected: usize, actual: usize },

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The background writer or reader task is gone.
    #[error("channel closed")]
    ChannelClosed,

    /// `flush_and_wait` was asked for a tag that was never issued.
    #[error("unknown message tag {0}")]
    UnknownTag(u64),

    // ── Serialization Errors ─────────────────────────────────────
    /// Encoding or decoding of a payload failed.
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl From<Box<bincode::ErrorKind>> for ArlinkError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        ArlinkError::Encoding(e.to_string())
    }
}

impl From<image::ImageError> for ArlinkError {
    fn from(e: image::ImageError) -> Self {
        ArlinkError::Encode(e.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for ArlinkError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        ArlinkError::ChannelClosed
    }
}
