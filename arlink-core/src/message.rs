//! Messages carried between the editor and the device.
//!
//! Frames are non-critical: a lost frame is superseded by the next one.
//! Control messages must arrive, and a `Goodbye` is what the shutdown
//! flush waits on.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::capture::types::PixelFormat;
use crate::error::ArlinkError;
use crate::flags::PacketFlags;
use crate::packet::{MAX_PAYLOAD_SIZE, Packet};

/// Protocol version announced in [`ControlMessage::Hello`].
pub const PROTOCOL_VERSION: u32 = 1;

/// Bincode bytes a [`FrameMessage`] adds around its pixel data: sequence,
/// width, height, both format tags and the data length prefix.
pub const FRAME_OVERHEAD: usize = 8 + 4 + 4 + 4 + 4 + 8;

/// Largest encoded frame that still fits in one packet.
pub const MAX_FRAME_DATA: usize = MAX_PAYLOAD_SIZE - FRAME_OVERHEAD;

// ── MessageKind ──────────────────────────────────────────────────

/// Header-level discriminant for the payload type.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// An encoded screen frame.
    Frame = 0x1,
    /// Session control (hello, goodbye).
    Control = 0x2,
}

impl TryFrom<u32> for MessageKind {
    type Error = ArlinkError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0x1 => Ok(MessageKind::Frame),
            0x2 => Ok(MessageKind::Control),
            _ => Err(ArlinkError::UnknownVariant {
                type_name: "MessageKind",
                value: value as u64,
            }),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ── ImageFormat ──────────────────────────────────────────────────

/// Compression applied to a frame's pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossy JPEG.
    Jpeg,
    /// Tightly packed rows compressed with zstd.
    Zstd,
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageFormat::Jpeg => write!(f, "jpeg"),
            ImageFormat::Zstd => write!(f, "zstd"),
        }
    }
}

// ── Payloads ─────────────────────────────────────────────────────

/// One captured, encoded display frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMessage {
    /// Capture sequence number, starting at 0.
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub image_format: ImageFormat,
    /// Layout of the pixels before compression.
    pub pixel_format: PixelFormat,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlMessage {
    /// First message of a session.
    Hello {
        protocol_version: u32,
        image_format: ImageFormat,
        max_fps: f64,
    },
    /// Last message of a session.
    Goodbye,
}

impl ControlMessage {
    pub fn hello(image_format: ImageFormat, max_fps: f64) -> Self {
        ControlMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
            image_format,
            max_fps,
        }
    }
}

// ── Message ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Frame(FrameMessage),
    Control(ControlMessage),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Frame(_) => MessageKind::Frame,
            Message::Control(_) => MessageKind::Control,
        }
    }

    /// Frames may be superseded; control messages may not.
    pub fn flags(&self) -> PacketFlags {
        match self {
            Message::Frame(_) => PacketFlags::NON_CRITICAL,
            Message::Control(_) => PacketFlags::empty(),
        }
    }

    /// Serialize into a packet stamped with `tag`.
    pub fn into_packet(self, tag: u64) -> Result<Packet, ArlinkError> {
        let kind = self.kind();
        let flags = self.flags();
        let payload = match &self {
            Message::Frame(frame) => bincode::serialize(frame)?,
            Message::Control(control) => bincode::serialize(control)?,
        };
        Packet::new(kind, flags, tag, payload)
    }

    /// Deserialize the payload of a received packet.
    pub fn from_packet(packet: &Packet) -> Result<Self, ArlinkError> {
        match packet.kind() {
            MessageKind::Frame => Ok(Message::Frame(bincode::deserialize(packet.payload())?)),
            MessageKind::Control => Ok(Message::Control(bincode::deserialize(packet.payload())?)),
        }
    }
}
