//! Device-side frame consumer.
//!
//! Reads packets from a [`Connection`], turns them into session events
//! and keeps running statistics. Frames can optionally be decoded to
//! pixels on arrival.

use tracing::{debug, warn};

use crate::capture::decoder::{DecodedFrame, FrameDecoder};
use crate::capture::types::Resolution;
use crate::error::ArlinkError;
use crate::message::{ControlMessage, FrameMessage, ImageFormat, Message};
use crate::network::connection::Connection;

/// Statistics over everything received so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiverStats {
    pub frames: u64,
    /// Compressed bytes received.
    pub bytes: u64,
    pub last_resolution: Resolution,
    /// Frames missing according to sequence numbers.
    pub sequence_gaps: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReceiverEvent {
    Hello {
        protocol_version: u32,
        image_format: ImageFormat,
        max_fps: f64,
    },
    Frame {
        frame: FrameMessage,
        /// Present when the receiver decodes frames.
        decoded: Option<DecodedFrame>,
    },
    Goodbye,
}

pub struct FrameReceiver {
    connection: Connection,
    decoder: Option<FrameDecoder>,
    next_sequence: Option<u64>,
    stats: ReceiverStats,
}

impl FrameReceiver {
    pub fn new(connection: Connection, decode_frames: bool) -> Self {
        Self {
            connection,
            decoder: decode_frames.then(FrameDecoder::new),
            next_sequence: None,
            stats: ReceiverStats::default(),
        }
    }

    /// Next event, or `None` once the peer has closed the connection.
    pub async fn next_event(&mut self) -> Option<Result<ReceiverEvent, ArlinkError>> {
        let message = match self.connection.recv_message().await? {
            Ok(message) => message,
            Err(e) => return Some(Err(e)),
        };

        Some(match message {
            Message::Control(ControlMessage::Hello {
                protocol_version,
                image_format,
                max_fps,
            }) => {
                debug!("peer hello: v{protocol_version}, {image_format}, {max_fps} fps");
                Ok(ReceiverEvent::Hello {
                    protocol_version,
                    image_format,
                    max_fps,
                })
            }
            Message::Control(ControlMessage::Goodbye) => Ok(ReceiverEvent::Goodbye),
            Message::Frame(frame) => self.accept_frame(frame),
        })
    }

    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    fn accept_frame(&mut self, frame: FrameMessage) -> Result<ReceiverEvent, ArlinkError> {
        if let Some(expected) = self.next_sequence {
            if frame.sequence > expected {
                let missing = frame.sequence - expected;
                warn!("{missing} frame(s) missing before {}", frame.sequence);
                self.stats.sequence_gaps += missing;
            }
        }
        self.next_sequence = Some(frame.sequence + 1);

        self.stats.frames += 1;
        self.stats.bytes += frame.data.len() as u64;
        self.stats.last_resolution = Resolution::new(frame.width, frame.height);

        let decoded = match &self.decoder {
            Some(decoder) => Some(decoder.decode_message(&frame)?),
            None => None,
        };
        Ok(ReceiverEvent::Frame { frame, decoded })
    }
}
