// SPDX-License-Identifier: MIT
// CPU scaler built on fast_image_resize (SIMD-accelerated).
// RGB8 in → RGB8 out, direct write into caller-provided dst buffer.

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x3;
use fir::{ResizeOptions, Resizer};

use crate::presets::{ScalePlan, Size};

#[derive(Debug)]
pub enum ScaleError {
    SourceTooSmall,
    BufferTooSmall,
    Fir(fir::ResizeError),
    ImageBuf(fir::ImageBufferError),
}

impl From<fir::ResizeError> for ScaleError { fn from(e: fir::ResizeError) -> Self { Self::Fir(e) } }
impl From<fir::ImageBufferError> for ScaleError { fn from(e: fir::ImageBufferError) -> Self { Self::ImageBuf(e) } }

impl std::fmt::Display for ScaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleError::SourceTooSmall => write!(f, "Source buffer smaller than its declared size"),
            ScaleError::BufferTooSmall => write!(f, "Output buffer too small"),
            ScaleError::Fir(e) => write!(f, "Fast image resize error: {}", e),
            ScaleError::ImageBuf(e) => write!(f, "Image buffer error: {}", e),
        }
    }
}

impl std::error::Error for ScaleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScaleError::Fir(e) => Some(e),
            ScaleError::ImageBuf(e) => Some(e),
            _ => None,
        }
    }
}

/// Bytes needed for a tightly packed RGB8 image of `size`.
pub fn rgb_len(size: Size) -> usize {
    (size.w as usize) * (size.h as usize) * 3
}

/// Resize tightly packed RGB8 `src_rgb` according to `plan`.
/// `dst` must hold at least `plan.out.w * plan.out.h * 3` bytes.
pub fn scale_rgb_cpu(
    resizer: &mut Resizer,
    src_rgb: &[u8],
    src: Size,
    plan: &ScalePlan,
    dst: &mut [u8],
) -> Result<(), ScaleError> {
    if src_rgb.len() < rgb_len(src) {
        return Err(ScaleError::SourceTooSmall);
    }
    let dst_len = rgb_len(plan.out);
    if dst.len() < dst_len {
        return Err(ScaleError::BufferTooSmall);
    }

    let src_view = TypedImageRef::<U8x3>::from_buffer(src.w, src.h, &src_rgb[..rgb_len(src)])?;
    let mut dst_image = TypedImage::<U8x3>::from_buffer(plan.out.w, plan.out.h, &mut dst[..dst_len])?;

    // Bilinear keeps module edges crisp enough for decoding and is cheaper than Lanczos.
    let opts = ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Bilinear));
    resizer.resize_typed::<U8x3>(&src_view, &mut dst_image, &opts)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::{build_plan, ScaleTarget};

    #[test]
    fn uniform_image_stays_uniform() {
        let src = Size { w: 8, h: 4 };
        let plan = build_plan(src, ScaleTarget::MaxLongSide(4));
        assert_eq!(plan.out, Size { w: 4, h: 2 });

        let rgb: Vec<u8> = [200u8, 10, 90].repeat(32);
        let mut out = vec![0u8; rgb_len(plan.out)];
        let mut resizer = Resizer::new();
        scale_rgb_cpu(&mut resizer, &rgb, src, &plan, &mut out).unwrap();

        for px in out.chunks_exact(3) {
            assert!((px[0] as i32 - 200).abs() <= 1);
            assert!((px[1] as i32 - 10).abs() <= 1);
            assert!((px[2] as i32 - 90).abs() <= 1);
        }
    }

    #[test]
    fn rejects_short_buffers() {
        let src = Size { w: 4, h: 4 };
        let plan = build_plan(src, ScaleTarget::MaxLongSide(2));
        let mut resizer = Resizer::new();

        let mut out = vec![0u8; rgb_len(plan.out)];
        let err = scale_rgb_cpu(&mut resizer, &[0u8; 10], src, &plan, &mut out).unwrap_err();
        assert!(matches!(err, ScaleError::SourceTooSmall));

        let rgb = vec![0u8; rgb_len(src)];
        let mut tiny = vec![0u8; 3];
        let err = scale_rgb_cpu(&mut resizer, &rgb, src, &plan, &mut tiny).unwrap_err();
        assert!(matches!(err, ScaleError::BufferTooSmall));
    }
}
