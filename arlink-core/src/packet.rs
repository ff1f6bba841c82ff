use std::fmt;

use crate::error::ArlinkError;
use crate::flags::PacketFlags;
use crate::header::{HEADER_SIZE, HeaderBytes, PacketHeader};
use crate::message::MessageKind;

/// Largest payload a single packet may carry (32 MiB).
pub const MAX_PAYLOAD_SIZE: usize = 32 * 1024 * 1024;

/// Largest complete packet on the wire.
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE;

#[derive(Clone)]
pub struct Packet {
    header: PacketHeader,
    payload: Vec<u8>,
}

impl Packet {
    pub fn new(
        kind: MessageKind,
        flags: PacketFlags,
        tag: u64,
        payload: Vec<u8>,
    ) -> Result<Self, ArlinkError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ArlinkError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let mut header = PacketHeader::new(kind, flags, tag, payload.len() as u64);
        header.set_checksum(checksum(&payload));
        Ok(Self { header, payload })
    }

    pub fn header(&self) -> &PacketHeader {
        &self.header
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn kind(&self) -> MessageKind {
        self.header.kind()
    }

    pub fn flags(&self) -> PacketFlags {
        self.header.flags()
    }

    pub fn tag(&self) -> u64 {
        self.header.tag()
    }

    /// Bytes this packet occupies on the wire.
    pub fn wire_len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.wire_len());
        out.extend_from_slice(&self.header.to_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Parse one complete packet. `bytes` must hold exactly header + payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArlinkError> {
        if bytes.len() < HEADER_SIZE {
            return Err(ArlinkError::InvalidPacketLength {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }
        let mut header_bytes: HeaderBytes = [0u8; HEADER_SIZE];
        header_bytes.copy_from_slice(&bytes[..HEADER_SIZE]);
        let header = PacketHeader::from_bytes(&header_bytes)?;

        let payload_len = header.payload_length() as usize;
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(ArlinkError::PayloadTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD_SIZE,
            });
        }
        if bytes.len() != HEADER_SIZE + payload_len {
            return Err(ArlinkError::InvalidPacketLength {
                expected: HEADER_SIZE + payload_len,
                actual: bytes.len(),
            });
        }

        let packet = Self {
            header,
            payload: bytes[HEADER_SIZE..].to_vec(),
        };
        if !packet.validate() {
            return Err(ArlinkError::ChecksumMismatch);
        }
        Ok(packet)
    }

    /// Whether the header checksum matches the payload.
    pub fn validate(&self) -> bool {
        self.header.checksum() == checksum(&self.payload)
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("header", &self.header)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// First four bytes of the blake3 hash; empty payloads carry 0.
fn checksum(payload: &[u8]) -> u32 {
    if payload.is_empty() {
        return 0;
    }
    let hash = blake3::hash(payload);
    let bytes = hash.as_bytes();
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_bytes_parse_back() {
        let packet = Packet::new(MessageKind::Frame, PacketFlags::NON_CRITICAL, 5, vec![9; 64]).unwrap();
        let bytes = packet.to_bytes();
        assert_eq!(bytes.len(), packet.wire_len());

        let parsed = Packet::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.tag(), 5);
        assert_eq!(parsed.payload(), &[9; 64][..]);
    }

    #[test]
    fn corrupted_payload_fails_checksum() {
        let packet = Packet::new(MessageKind::Control, PacketFlags::empty(), 1, b"hello".to_vec()).unwrap();
        let mut bytes = packet.to_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(
            Packet::from_bytes(&bytes),
            Err(ArlinkError::ChecksumMismatch)
        ));
    }

    #[test]
    fn truncated_packet_rejected() {
        let packet = Packet::new(MessageKind::Control, PacketFlags::empty(), 1, b"hello".to_vec()).unwrap();
        let bytes = packet.to_bytes();
        assert!(matches!(
            Packet::from_bytes(&bytes[..bytes.len() - 2]),
            Err(ArlinkError::InvalidPacketLength { .. })
        ));
    }

    #[test]
    fn empty_payload_has_zero_checksum() {
        let packet = Packet::new(MessageKind::Control, PacketFlags::empty(), 0, Vec::new()).unwrap();
        assert_eq!(packet.header().checksum(), 0);
        assert!(packet.validate());
    }

    #[test]
    fn oversized_payload_rejected() {
        let err = Packet::new(
            MessageKind::Frame,
            PacketFlags::NON_CRITICAL,
            0,
            vec![0; MAX_PAYLOAD_SIZE + 1],
        )
        .unwrap_err();
        assert!(matches!(err, ArlinkError::PayloadTooLarge { .. }));
    }
}
