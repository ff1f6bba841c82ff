//! Frame encoders.
//!
//! An encoder turns the capture buffer into an opaque compressed blob.
//! Each encoder declares the pixel format it wants the capture buffer in;
//! the conversion happens during the blit, not here.
//!
//! - [`JpegEncoder`]: lossy, RGB8 input, via the `image` crate.
//! - [`ZstdEncoder`]: lossless, RGBA8 input, tightly packed rows.

use image::ExtendedColorType;
use image::codecs::jpeg;

use crate::capture::types::PixelFormat;
use crate::error::ArlinkError;
use crate::message::ImageFormat;

/// Compresses raw pixel buffers. Deterministic for identical input.
pub trait FrameEncoder: Send {
    fn encode(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Vec<u8>, ArlinkError>;

    /// Pixel format the capture buffer must use.
    fn capture_format(&self) -> PixelFormat;

    /// Compression tag carried in frame messages.
    fn image_format(&self) -> ImageFormat;
}

impl FrameEncoder for Box<dyn FrameEncoder> {
    fn encode(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Vec<u8>, ArlinkError> {
        (**self).encode(pixels, width, height, format)
    }

    fn capture_format(&self) -> PixelFormat {
        (**self).capture_format()
    }

    fn image_format(&self) -> ImageFormat {
        (**self).image_format()
    }
}

/// Build the encoder for `format`.
pub fn encoder_for(format: ImageFormat, jpeg_quality: u8, zstd_level: i32) -> Box<dyn FrameEncoder> {
    match format {
        ImageFormat::Jpeg => Box::new(JpegEncoder::new(jpeg_quality)),
        ImageFormat::Zstd => Box::new(ZstdEncoder::new(zstd_level)),
    }
}

fn check_len(pixels: &[u8], width: u32, height: u32, format: PixelFormat) -> Result<(), ArlinkError> {
    let expected = width as usize * height as usize * format.bytes_per_pixel();
    if pixels.len() != expected {
        return Err(ArlinkError::Encode(format!(
            "{width}x{height} {format:?} needs {expected} bytes, got {}",
            pixels.len()
        )));
    }
    Ok(())
}

// ── JpegEncoder ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct JpegEncoder {
    quality: u8,
}

impl JpegEncoder {
    /// `quality` is clamped to 1..=100.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl FrameEncoder for JpegEncoder {
    fn encode(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Vec<u8>, ArlinkError> {
        if format != PixelFormat::Rgb8 {
            return Err(ArlinkError::Encode(format!(
                "jpeg encoder expects Rgb8 input, got {format:?}"
            )));
        }
        check_len(pixels, width, height, format)?;

        let mut out = Vec::new();
        {
            let mut encoder = jpeg::JpegEncoder::new_with_quality(&mut out, self.quality);
            encoder.encode(pixels, width, height, ExtendedColorType::Rgb8)?;
        }
        Ok(out)
    }

    fn capture_format(&self) -> PixelFormat {
        PixelFormat::Rgb8
    }

    fn image_format(&self) -> ImageFormat {
        ImageFormat::Jpeg
    }
}

// ── ZstdEncoder ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ZstdEncoder {
    level: i32,
}

impl ZstdEncoder {
    /// Level 1 favours speed; the capture loop is latency-bound.
    pub fn new(level: i32) -> Self {
        Self { level }
    }

    pub fn level(&self) -> i32 {
        self.level
    }
}

impl FrameEncoder for ZstdEncoder {
    fn encode(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Vec<u8>, ArlinkError> {
        check_len(pixels, width, height, format)?;
        zstd::encode_all(pixels, self.level)
            .map_err(|e| ArlinkError::Encode(format!("zstd encode failed: {e}")))
    }

    fn capture_format(&self) -> PixelFormat {
        PixelFormat::Rgba8
    }

    fn image_format(&self) -> ImageFormat {
        ImageFormat::Zstd
    }
}
