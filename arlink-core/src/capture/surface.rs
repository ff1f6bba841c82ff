//! Render surfaces the sender captures from.
//!
//! A [`RenderSurface`] exposes the live display size and, once the
//! frame's rendering is complete, its pixels. Reading copies the image
//! into a capture buffer, downscaling and converting to the buffer's
//! pixel format on the way.

use crate::capture::buffer::FrameBuffer;
use crate::capture::types::{PixelFormat, Resolution};
use crate::error::ArlinkError;

/// Source of display frames.
pub trait RenderSurface {
    /// Current display size; read every frame.
    fn size(&self) -> Resolution;

    /// Copy the fully rendered image into `dst`, scaling to the buffer's
    /// resolution and converting to its format.
    fn read_pixels(&mut self, dst: &mut FrameBuffer) -> Result<(), ArlinkError>;

    /// Render the current frame. Drivers call this between the frame
    /// start and the render boundary; surfaces rendered elsewhere keep
    /// the default no-op.
    fn render_pass(&mut self) {}
}

/// Nearest-neighbour copy of `src` into `dst` with format conversion.
///
/// `src` holds `src_res.height` rows of `src_stride` bytes each.
pub fn blit_scaled(
    src: &[u8],
    src_res: Resolution,
    src_stride: usize,
    src_format: PixelFormat,
    dst: &mut FrameBuffer,
) -> Result<(), ArlinkError> {
    let dst_res = dst.resolution();
    if src_res.is_empty() || dst_res.is_empty() {
        return Ok(());
    }

    let src_bpp = src_format.bytes_per_pixel();
    if src_stride < src_res.width as usize * src_bpp {
        return Err(ArlinkError::Capture(format!(
            "stride {src_stride} shorter than a {}px row",
            src_res.width
        )));
    }
    let needed = src_stride * (src_res.height as usize - 1) + src_res.width as usize * src_bpp;
    if src.len() < needed {
        return Err(ArlinkError::Capture(format!(
            "surface holds {} bytes, {needed} needed",
            src.len()
        )));
    }

    let dst_format = dst.format();
    let dst_bpp = dst_format.bytes_per_pixel();
    let dst_stride = dst.stride();
    let [sr, sg, sb] = src_format.rgb_offsets();
    let [dr, dg, db] = dst_format.rgb_offsets();
    let src_alpha = src_format.alpha_offset();
    let dst_alpha = dst_format.alpha_offset();

    let out = dst.data_mut();
    for y in 0..dst_res.height as usize {
        let src_y = y * src_res.height as usize / dst_res.height as usize;
        let src_row = &src[src_y * src_stride..];
        let dst_row = &mut out[y * dst_stride..(y + 1) * dst_stride];
        for x in 0..dst_res.width as usize {
            let src_x = x * src_res.width as usize / dst_res.width as usize;
            let s = &src_row[src_x * src_bpp..src_x * src_bpp + src_bpp];
            let d = &mut dst_row[x * dst_bpp..x * dst_bpp + dst_bpp];
            d[dr] = s[sr];
            d[dg] = s[sg];
            d[db] = s[sb];
            if let Some(da) = dst_alpha {
                d[da] = src_alpha.map_or(0xFF, |sa| s[sa]);
            }
        }
    }
    Ok(())
}

// ── SoftwareSurface ──────────────────────────────────────────────

/// CPU-side BGRA surface with a moving test pattern.
///
/// Stands in for an engine backbuffer when running headless.
#[derive(Debug, Clone)]
pub struct SoftwareSurface {
    resolution: Resolution,
    data: Vec<u8>,
    frame: u64,
}

impl SoftwareSurface {
    pub const FORMAT: PixelFormat = PixelFormat::Bgra8;

    pub fn new(width: u32, height: u32) -> Self {
        let resolution = Resolution::new(width, height);
        Self {
            resolution,
            data: vec![0u8; resolution.pixel_count() * Self::FORMAT.bytes_per_pixel()],
            frame: 0,
        }
    }

    /// Change the display size. Contents are cleared.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.resolution = Resolution::new(width, height);
        self.data = vec![0u8; self.resolution.pixel_count() * Self::FORMAT.bytes_per_pixel()];
    }

    /// Paint every pixel with one colour.
    pub fn fill(&mut self, r: u8, g: u8, b: u8) {
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&[b, g, r, 0xFF]);
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Frames rendered so far.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    fn stride(&self) -> usize {
        self.resolution.width as usize * Self::FORMAT.bytes_per_pixel()
    }
}

impl RenderSurface for SoftwareSurface {
    fn size(&self) -> Resolution {
        self.resolution
    }

    fn read_pixels(&mut self, dst: &mut FrameBuffer) -> Result<(), ArlinkError> {
        blit_scaled(&self.data, self.resolution, self.stride(), Self::FORMAT, dst)
    }

    fn render_pass(&mut self) {
        self.frame += 1;
        let width = self.resolution.width as usize;
        if width == 0 {
            return;
        }
        let shift = self.frame as usize;
        let height = self.resolution.height.max(1) as usize;
        for (i, px) in self.data.chunks_exact_mut(4).enumerate() {
            let x = i % width;
            let y = i / width;
            let r = ((x + shift) * 255 / width) as u8;
            let g = (y * 255 / height) as u8;
            let b = (shift % 256) as u8;
            px.copy_from_slice(&[b, g, r, 0xFF]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::buffer::FrameBufferCache;

    #[test]
    fn converts_bgra_to_rgb() {
        let mut surface = SoftwareSurface::new(4, 4);
        surface.fill(10, 20, 30);

        let mut cache = FrameBufferCache::new();
        cache.ensure(4, 4, PixelFormat::Rgb8);
        let buffer = cache.buffer_mut().unwrap();
        surface.read_pixels(buffer).unwrap();

        assert!(buffer.data().chunks_exact(3).all(|px| px == [10, 20, 30]));
    }

    #[test]
    fn downscales_nearest_neighbour() {
        // 2x1 source: left red, right blue.
        let src = [0, 0, 255, 255, 255, 0, 0, 255];
        let mut cache = FrameBufferCache::new();
        cache.ensure(1, 1, PixelFormat::Rgba8);
        let buffer = cache.buffer_mut().unwrap();
        blit_scaled(&src, Resolution::new(2, 1), 8, PixelFormat::Bgra8, buffer).unwrap();
        assert_eq!(buffer.data(), &[255, 0, 0, 255]);
    }

    #[test]
    fn honours_padded_stride() {
        // 1x2 source with 8-byte rows (4 bytes padding).
        let src = [1, 2, 3, 4, 0, 0, 0, 0, 5, 6, 7, 8];
        let mut cache = FrameBufferCache::new();
        cache.ensure(1, 2, PixelFormat::Bgra8);
        let buffer = cache.buffer_mut().unwrap();
        blit_scaled(&src, Resolution::new(1, 2), 8, PixelFormat::Bgra8, buffer).unwrap();
        assert_eq!(buffer.data(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn short_source_is_a_capture_error() {
        let mut cache = FrameBufferCache::new();
        cache.ensure(2, 2, PixelFormat::Rgb8);
        let buffer = cache.buffer_mut().unwrap();
        let err = blit_scaled(&[0; 4], Resolution::new(2, 2), 8, PixelFormat::Bgra8, buffer).unwrap_err();
        assert!(matches!(err, ArlinkError::Capture(_)));
    }

    #[test]
    fn render_pass_animates() {
        let mut surface = SoftwareSurface::new(16, 8);
        surface.render_pass();
        let first = surface.pixels().to_vec();
        surface.render_pass();
        assert_ne!(first, surface.pixels());
        assert_eq!(surface.frame_count(), 2);
    }

    #[test]
    fn resize_changes_size() {
        let mut surface = SoftwareSurface::new(1920, 1080);
        surface.resize(960, 540);
        assert_eq!(surface.size(), Resolution::new(960, 540));
        assert_eq!(surface.pixels().len(), 960 * 540 * 4);
    }
}
