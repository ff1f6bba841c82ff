//! Packet framing for `tokio_util::codec::Framed`.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ArlinkError;
use crate::header::{HEADER_SIZE, HeaderBytes, PacketHeader};
use crate::packet::{MAX_PAYLOAD_SIZE, Packet};

#[derive(Debug, Default)]
pub struct PacketCodec;

impl Decoder for PacketCodec {
    type Item = Packet;
    type Error = ArlinkError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let mut header_bytes: HeaderBytes = [0u8; HEADER_SIZE];
        header_bytes.copy_from_slice(&src[..HEADER_SIZE]);
        let header = PacketHeader::from_bytes(&header_bytes)?;

        let payload_len = header.payload_length() as usize;
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(ArlinkError::PayloadTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let total = HEADER_SIZE + payload_len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let bytes = src.split_to(total);
        Packet::from_bytes(bytes.chunk()).map(Some)
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = ArlinkError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.wire_len());
        dst.extend_from_slice(&item.header().to_bytes());
        dst.extend_from_slice(item.payload());
        Ok(())
    }
}
