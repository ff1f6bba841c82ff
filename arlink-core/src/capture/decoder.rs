//! Frame decoder.
//!
//! Turns an encoded frame back into pixels. Used by the receiver and by
//! the sender's debug preview, which round-trips every frame it sends so
//! the local image can be checked against what the device will show.

use crate::capture::types::{PixelFormat, Resolution};
use crate::error::ArlinkError;
use crate::message::{FrameMessage, ImageFormat};

/// A decompressed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub resolution: Resolution,
    pub format: PixelFormat,
    /// Tightly packed rows.
    pub data: Vec<u8>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FrameDecoder;

impl FrameDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode `data` produced by the encoder for `image_format`.
    ///
    /// `resolution` and `format` describe the raw input the encoder saw;
    /// a mismatch with what the blob decodes to is an error.
    pub fn decode(
        &self,
        image_format: ImageFormat,
        data: &[u8],
        resolution: Resolution,
        format: PixelFormat,
    ) -> Result<DecodedFrame, ArlinkError> {
        let decoded = match image_format {
            ImageFormat::Jpeg => {
                let image = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
                    .map_err(|e| ArlinkError::Decode(format!("jpeg decode failed: {e}")))?
                    .to_rgb8();
                DecodedFrame {
                    resolution: Resolution::new(image.width(), image.height()),
                    format: PixelFormat::Rgb8,
                    data: image.into_raw(),
                }
            }
            ImageFormat::Zstd => {
                let expected = resolution.pixel_count() * format.bytes_per_pixel();
                // Output is capped at the declared frame size.
                let raw = zstd::bulk::decompress(data, expected)
                    .map_err(|e| ArlinkError::Decode(format!("zstd decode failed: {e}")))?;
                if raw.len() != expected {
                    return Err(ArlinkError::Decode(format!(
                        "expected {expected} bytes for {resolution}, got {}",
                        raw.len()
                    )));
                }
                DecodedFrame {
                    resolution,
                    format,
                    data: raw,
                }
            }
        };

        if decoded.resolution != resolution {
            return Err(ArlinkError::Decode(format!(
                "frame decoded to {}, header says {resolution}",
                decoded.resolution
            )));
        }
        Ok(decoded)
    }

    /// Decode a received frame message.
    pub fn decode_message(&self, frame: &FrameMessage) -> Result<DecodedFrame, ArlinkError> {
        self.decode(
            frame.image_format,
            &frame.data,
            Resolution::new(frame.width, frame.height),
            frame.pixel_format,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::encoder::{FrameEncoder, JpegEncoder, ZstdEncoder};

    #[test]
    fn zstd_is_lossless() {
        let pixels: Vec<u8> = (0..6 * 4 * 4).map(|i| i as u8).collect();
        let data = ZstdEncoder::new(1)
            .encode(&pixels, 6, 4, PixelFormat::Rgba8)
            .unwrap();
        let decoded = FrameDecoder::new()
            .decode(ImageFormat::Zstd, &data, Resolution::new(6, 4), PixelFormat::Rgba8)
            .unwrap();
        assert_eq!(decoded.data, pixels);
    }

    #[test]
    fn zstd_output_larger_than_declared_is_rejected() {
        let pixels = vec![0u8; 64 * 64 * 4];
        let data = ZstdEncoder::new(1)
            .encode(&pixels, 64, 64, PixelFormat::Rgba8)
            .unwrap();
        let err = FrameDecoder::new()
            .decode(ImageFormat::Zstd, &data, Resolution::new(2, 2), PixelFormat::Rgba8)
            .unwrap_err();
        assert!(matches!(err, ArlinkError::Decode(_)));
    }

    #[test]
    fn zstd_output_shorter_than_declared_is_rejected() {
        let pixels = vec![9u8; 2 * 2 * 4];
        let data = ZstdEncoder::new(1)
            .encode(&pixels, 2, 2, PixelFormat::Rgba8)
            .unwrap();
        let err = FrameDecoder::new()
            .decode(ImageFormat::Zstd, &data, Resolution::new(4, 4), PixelFormat::Rgba8)
            .unwrap_err();
        assert!(matches!(err, ArlinkError::Decode(_)));
    }

    #[test]
    fn jpeg_keeps_dimensions() {
        let pixels = vec![128u8; 40 * 30 * 3];
        let data = JpegEncoder::new(90)
            .encode(&pixels, 40, 30, PixelFormat::Rgb8)
            .unwrap();
        let decoded = FrameDecoder::new()
            .decode(ImageFormat::Jpeg, &data, Resolution::new(40, 30), PixelFormat::Rgb8)
            .unwrap();
        assert_eq!(decoded.resolution, Resolution::new(40, 30));
        assert_eq!(decoded.data.len(), pixels.len());
        // Flat grey survives JPEG almost untouched.
        assert!(decoded.data.iter().all(|&v| v.abs_diff(128) <= 2));
    }

    #[test]
    fn dimension_mismatch_is_reported() {
        let pixels = vec![0u8; 8 * 8 * 3];
        let data = JpegEncoder::new(90)
            .encode(&pixels, 8, 8, PixelFormat::Rgb8)
            .unwrap();
        let err = FrameDecoder::new()
            .decode(ImageFormat::Jpeg, &data, Resolution::new(4, 4), PixelFormat::Rgb8)
            .unwrap_err();
        assert!(matches!(err, ArlinkError::Decode(_)));
    }

    #[test]
    fn garbage_fails_to_decode() {
        let err = FrameDecoder::new()
            .decode(ImageFormat::Jpeg, b"not a jpeg", Resolution::new(1, 1), PixelFormat::Rgb8)
            .unwrap_err();
        assert!(matches!(err, ArlinkError::Decode(_)));
    }
}
