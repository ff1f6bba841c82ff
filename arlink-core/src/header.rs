//! Fixed-size packet header.
//!
//! ```text
//! magic:          [u8; 4]  "ARL0"
//! checksum:       u32      first 4 bytes of blake3(payload), 0 if empty
//! kind:           u32      see `MessageKind`
//! flags:          u32      see `PacketFlags`
//! tag:            u64      per-connection message tag
//! payload_length: u64
//! ```
//!
//! All fields are little-endian.

use crate::error::ArlinkError;
use crate::flags::PacketFlags;
use crate::message::MessageKind;

/// Header size on the wire.
pub const HEADER_SIZE: usize = 32;

/// Magic prefix of every packet.
pub const MAGIC: [u8; 4] = *b"ARL0";

pub type HeaderBytes = [u8; HEADER_SIZE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    checksum: u32,
    kind: MessageKind,
    flags: PacketFlags,
    tag: u64,
    payload_length: u64,
}

impl PacketHeader {
    pub fn new(kind: MessageKind, flags: PacketFlags, tag: u64, payload_length: u64) -> Self {
        Self {
            checksum: 0,
            kind,
            flags,
            tag,
            payload_length,
        }
    }

    pub fn to_bytes(&self) -> HeaderBytes {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4..8].copy_from_slice(&self.checksum.to_le_bytes());
        buf[8..12].copy_from_slice(&(self.kind as u32).to_le_bytes());
        buf[12..16].copy_from_slice(&self.flags.bits().to_le_bytes());
        buf[16..24].copy_from_slice(&self.tag.to_le_bytes());
        buf[24..32].copy_from_slice(&self.payload_length.to_le_bytes());
        buf
    }

    pub fn from_bytes(bytes: &HeaderBytes) -> Result<Self, ArlinkError> {
        if bytes[0..4] != MAGIC {
            return Err(ArlinkError::InvalidMagic);
        }
        let kind = MessageKind::try_from(u32::from_le_bytes(le4(&bytes[8..12])))?;
        Ok(Self {
            checksum: u32::from_le_bytes(le4(&bytes[4..8])),
            kind,
            flags: PacketFlags::from_bits_truncate(u32::from_le_bytes(le4(&bytes[12..16]))),
            tag: u64::from_le_bytes(le8(&bytes[16..24])),
            payload_length: u64::from_le_bytes(le8(&bytes[24..32])),
        })
    }

    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    pub fn set_checksum(&mut self, checksum: u32) {
        self.checksum = checksum;
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn flags(&self) -> PacketFlags {
        self.flags
    }

    pub fn tag(&self) -> u64 {
        self.tag
    }

    pub fn payload_length(&self) -> u64 {
        self.payload_length
    }
}

fn le4(slice: &[u8]) -> [u8; 4] {
    let mut out = [0u8; 4];
    out.copy_from_slice(slice);
    out
}

fn le8(slice: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(slice);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let mut hdr = PacketHeader::new(MessageKind::Frame, PacketFlags::NON_CRITICAL, 7, 1024);
        hdr.set_checksum(0xDEAD_BEEF);
        let bytes = hdr.to_bytes();

        assert_eq!(&bytes[0..4], b"ARL0");
        assert_eq!(&bytes[4..8], &0xDEAD_BEEFu32.to_le_bytes());
        assert_eq!(&bytes[16..24], &7u64.to_le_bytes());

        let parsed = PacketHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, hdr);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = PacketHeader::new(MessageKind::Control, PacketFlags::empty(), 0, 0).to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            PacketHeader::from_bytes(&bytes),
            Err(ArlinkError::InvalidMagic)
        ));
    }

    #[test]
    fn rejects_unknown_kind() {
        let mut bytes = PacketHeader::new(MessageKind::Control, PacketFlags::empty(), 0, 0).to_bytes();
        bytes[8..12].copy_from_slice(&0x99u32.to_le_bytes());
        assert!(matches!(
            PacketHeader::from_bytes(&bytes),
            Err(ArlinkError::UnknownVariant { .. })
        ));
    }
}
