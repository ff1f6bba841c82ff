//! Reusable capture buffer.
//!
//! The buffer is reallocated only when the requested dimensions (or
//! format) differ from the current ones, so a stable display size costs
//! one allocation for the whole session.

use tracing::debug;

use crate::capture::types::{PixelFormat, Resolution};

/// Identity of one allocation. Two equal handles refer to the same
/// backing buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle {
    pub id: u64,
    pub resolution: Resolution,
    pub format: PixelFormat,
}

/// A tightly packed pixel buffer (`width * bpp` bytes per row).
#[derive(Debug)]
pub struct FrameBuffer {
    handle: BufferHandle,
    data: Vec<u8>,
}

impl FrameBuffer {
    fn allocate(handle: BufferHandle) -> Self {
        let len = handle.resolution.pixel_count() * handle.format.bytes_per_pixel();
        Self {
            handle,
            data: vec![0u8; len],
        }
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn resolution(&self) -> Resolution {
        self.handle.resolution
    }

    pub fn width(&self) -> u32 {
        self.handle.resolution.width
    }

    pub fn height(&self) -> u32 {
        self.handle.resolution.height
    }

    pub fn format(&self) -> PixelFormat {
        self.handle.format
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width() as usize * self.format().bytes_per_pixel()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Owns at most one [`FrameBuffer`].
#[derive(Debug, Default)]
pub struct FrameBufferCache {
    buffer: Option<FrameBuffer>,
    next_id: u64,
    allocations: u64,
}

impl FrameBufferCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a buffer of the requested size and format, allocating a new
    /// one only if the current buffer is missing or stale.
    ///
    /// Contents are not preserved across a reallocation.
    pub fn ensure(&mut self, width: u32, height: u32, format: PixelFormat) -> BufferHandle {
        let resolution = Resolution::new(width, height);
        if let Some(buffer) = &self.buffer {
            if buffer.resolution() == resolution && buffer.format() == format {
                return buffer.handle();
            }
            debug!(
                "capture buffer {} -> {resolution} ({format:?})",
                buffer.resolution()
            );
        }

        // Release the old buffer before allocating its replacement.
        self.buffer = None;

        let handle = BufferHandle {
            id: self.next_id,
            resolution,
            format,
        };
        self.next_id += 1;
        self.allocations += 1;
        self.buffer = Some(FrameBuffer::allocate(handle));
        handle
    }

    pub fn buffer(&self) -> Option<&FrameBuffer> {
        self.buffer.as_ref()
    }

    pub fn buffer_mut(&mut self) -> Option<&mut FrameBuffer> {
        self.buffer.as_mut()
    }

    /// Handle of the current buffer, if any.
    pub fn current(&self) -> Option<BufferHandle> {
        self.buffer.as_ref().map(FrameBuffer::handle)
    }

    /// Drop the backing buffer.
    pub fn release(&mut self) {
        self.buffer = None;
    }

    /// Number of allocations made since construction.
    pub fn allocations(&self) -> u64 {
        self.allocations
    }
}
