//! # Raw Frames
//!
//! Preview frames as delivered by a capture device: a shared byte buffer
//! tagged with its pixel format and dimensions. Cloning a frame shares the
//! buffer, so handing a frame to the detection context costs one reference
//! count increment.

use std::fmt;
use std::sync::Arc;

use crate::preview::Resolution;

/// Pixel layouts a capture device may deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// YUV 4:2:0, full-resolution Y plane followed by interleaved V/U samples
    /// at half resolution. The default preview format on Android devices.
    Nv21,
    /// Packed 8-bit R, G, B.
    Rgb24,
    /// Packed 8-bit B, G, R, A.
    Bgra32,
    /// Single 8-bit luma channel.
    Gray8,
}

impl PixelFormat {
    /// Minimum number of bytes a frame of `width` x `height` occupies.
    pub fn frame_len(self, width: u32, height: u32) -> usize {
        let (w, h) = (width as usize, height as usize);
        match self {
            // chroma planes are subsampled 2x2; odd sizes round up
            PixelFormat::Nv21 => w * h + 2 * w.div_ceil(2) * h.div_ceil(2),
            PixelFormat::Rgb24 => w * h * 3,
            PixelFormat::Bgra32 => w * h * 4,
            PixelFormat::Gray8 => w * h,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PixelFormat::Nv21 => "nv21",
            PixelFormat::Rgb24 => "rgb24",
            PixelFormat::Bgra32 => "bgra32",
            PixelFormat::Gray8 => "gray8",
        };
        f.write_str(name)
    }
}

/// One preview frame.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Monotonic sequence number assigned by the device.
    pub seq: u64,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Arc<Vec<u8>>,
}

impl RawFrame {
    pub fn new(seq: u64, width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            seq,
            width,
            height,
            format,
            data: Arc::new(data),
        }
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Whether the buffer is large enough for the declared format and size.
    pub fn is_complete(&self) -> bool {
        self.data.len() >= self.format.frame_len(self.width, self.height)
    }
}
