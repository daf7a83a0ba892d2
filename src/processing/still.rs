//! # Still Conversion
//!
//! Turns a raw preview frame into an RGB still for the detector:
//!
//! 1. decode the device pixel format (NV21, RGB24, BGRA32, Gray8) to RGB8
//! 2. optionally round-trip through JPEG at the configured quality
//! 3. optionally downscale according to a [`DetectPreset`]
//!
//! Conversion runs on the detection context, never on the frame producer.

use std::io::Cursor;

use fast_image_resize::Resizer;
use frame_scale::cpu::{rgb_len, scale_rgb_cpu};
use frame_scale::presets::{DetectPreset, Size, build_plan};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, ImageReader, RgbImage};

use crate::core::{PixelFormat, RawFrame};
use crate::error::{ScanError, ScanResult};

/// A still image ready for detection.
#[derive(Debug, Clone)]
pub struct StillImage {
    /// Sequence number of the source frame.
    pub seq: u64,
    pub image: RgbImage,
}

/// Conversion parameters, usually derived from
/// [`ScanConfig`](crate::config::ScanConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConverterOptions {
    pub jpeg_quality: Option<u8>,
    pub detect_preset: DetectPreset,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: Some(50),
            detect_preset: DetectPreset::Native,
        }
    }
}

/// Raw frame to still image converter.
#[derive(Debug, Clone, Default)]
pub struct StillConverter {
    options: ConverterOptions,
}

impl StillConverter {
    pub fn new(options: ConverterOptions) -> Self {
        Self { options }
    }

    /// Convert `frame` into a still image.
    pub fn convert(&self, frame: &RawFrame) -> ScanResult<StillImage> {
        if frame.width == 0 || frame.height == 0 {
            return Err(ScanError::conversion(
                "validate_frame",
                format!("frame {} has an empty size", frame.seq),
            ));
        }
        if !frame.is_complete() {
            return Err(ScanError::conversion(
                "validate_frame",
                format!(
                    "{} buffer of {} bytes is too short for {}x{} (need {})",
                    frame.format,
                    frame.data.len(),
                    frame.width,
                    frame.height,
                    frame.format.frame_len(frame.width, frame.height)
                ),
            )
            .with_metadata("seq", frame.seq.to_string()));
        }

        let mut image = to_rgb(frame)?;
        if let Some(quality) = self.options.jpeg_quality {
            image = jpeg_round_trip(&image, quality)?;
        }
        image = downscale(image, self.options.detect_preset)?;

        Ok(StillImage {
            seq: frame.seq,
            image,
        })
    }
}

fn to_rgb(frame: &RawFrame) -> ScanResult<RgbImage> {
    let (w, h) = (frame.width, frame.height);
    let data = frame.data.as_slice();
    let rgb = match frame.format {
        PixelFormat::Nv21 => nv21_to_rgb(data, w as usize, h as usize),
        PixelFormat::Rgb24 => data[..PixelFormat::Rgb24.frame_len(w, h)].to_vec(),
        PixelFormat::Bgra32 => data[..PixelFormat::Bgra32.frame_len(w, h)]
            .chunks_exact(4)
            .flat_map(|px| [px[2], px[1], px[0]])
            .collect(),
        PixelFormat::Gray8 => data[..PixelFormat::Gray8.frame_len(w, h)]
            .iter()
            .flat_map(|&y| [y, y, y])
            .collect(),
    };
    RgbImage::from_raw(w, h, rgb)
        .ok_or_else(|| ScanError::conversion("to_rgb", "decoded buffer does not match frame size"))
}

/// BT.601 limited-range YUV to RGB, integer arithmetic.
fn nv21_to_rgb(data: &[u8], width: usize, height: usize) -> Vec<u8> {
    let chroma_stride = width.div_ceil(2) * 2;
    let (luma, chroma) = data.split_at(width * height);
    let mut out = Vec::with_capacity(width * height * 3);

    for y in 0..height {
        let chroma_row = (y / 2) * chroma_stride;
        for x in 0..width {
            let vu = chroma_row + (x / 2) * 2;
            let c = luma[y * width + x] as i32 - 16;
            let e = chroma[vu] as i32 - 128;
            let d = chroma[vu + 1] as i32 - 128;

            let r = (298 * c + 409 * e + 128) >> 8;
            let g = (298 * c - 100 * d - 208 * e + 128) >> 8;
            let b = (298 * c + 516 * d + 128) >> 8;
            out.extend_from_slice(&[clamp_u8(r), clamp_u8(g), clamp_u8(b)]);
        }
    }
    out
}

#[inline]
fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

fn jpeg_round_trip(image: &RgbImage, quality: u8) -> ScanResult<RgbImage> {
    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, quality).encode_image(image)?;
    let decoded = ImageReader::with_format(Cursor::new(encoded), ImageFormat::Jpeg).decode()?;
    Ok(decoded.to_rgb8())
}

fn downscale(image: RgbImage, preset: DetectPreset) -> ScanResult<RgbImage> {
    let src = Size {
        w: image.width(),
        h: image.height(),
    };
    let plan = build_plan(src, preset.to_target());
    if plan.is_identity() {
        return Ok(image);
    }

    let mut out = vec![0u8; rgb_len(plan.out)];
    scale_rgb_cpu(&mut Resizer::new(), image.as_raw(), src, &plan, &mut out)?;
    RgbImage::from_raw(plan.out.w, plan.out.h, out)
        .ok_or_else(|| ScanError::conversion("downscale", "scaled buffer does not match plan"))
}
