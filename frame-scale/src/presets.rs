// SPDX-License-Identifier: MIT
//! # Scale Presets and Plan Computation
//!
//! Computes output dimensions for stills that are about to be handed to a
//! barcode detector. Only aspect-preserving downscales are produced: a
//! distorted symbol decodes worse than a small one.
//!
//! - All computations use floating-point and round to integers
//! - No upscaling: stills smaller than the target are left unchanged
//! - Every output side is clamped to at least 1px

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

/// Size constraint applied when planning a scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScaleTarget {
    /// Keep the input size.
    Native,
    /// Clamp the longest side to a maximum value, derive the other side proportionally.
    MaxLongSide(u32),
}

/// Computed scaling parameters for one input size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScalePlan {
    /// Original input dimensions
    pub input: Size,
    /// Target used for planning
    pub target: ScaleTarget,
    /// Final output dimensions
    pub out: Size,
}

impl ScalePlan {
    /// True when the plan leaves the input untouched.
    pub fn is_identity(&self) -> bool {
        self.input == self.out
    }
}

/// Compute a scale plan from an input size and target constraint.
pub fn build_plan(input: Size, target: ScaleTarget) -> ScalePlan {
    let out = match target {
        ScaleTarget::Native => input,
        ScaleTarget::MaxLongSide(max_side) => {
            let (w, h) = fit_preserve(input, max_side);
            Size { w, h }
        }
    };
    ScalePlan { input, target, out }
}

/// Fit within `max_long` on the longest dimension, preserving aspect ratio.
fn fit_preserve(input: Size, max_long: u32) -> (u32, u32) {
    let (w, h) = (input.w as f64, input.h as f64);
    let long = w.max(h).max(1.0);
    let s = (max_long as f64 / long).min(1.0); // don't upscale
    (
        ((w * s).round() as u32).max(1),
        ((h * s).round() as u32).max(1),
    )
}

/// Detector input presets.
///
/// Most 1D and 2D symbols still decode when the longest side is 640px;
/// the larger presets help with small or distant codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DetectPreset {
    /// Hand the detector the full preview resolution
    #[default]
    #[clap(name = "native")]
    Native,
    /// Longest side clamped to 1280px
    #[clap(name = "long1280")]
    Long1280,
    /// Longest side clamped to 960px
    #[clap(name = "long960")]
    Long960,
    /// Longest side clamped to 640px
    #[clap(name = "long640")]
    Long640,
}

impl DetectPreset {
    /// Convert the preset to the ScaleTarget used for plan computation.
    pub fn to_target(self) -> ScaleTarget {
        match self {
            DetectPreset::Native => ScaleTarget::Native,
            DetectPreset::Long1280 => ScaleTarget::MaxLongSide(1280),
            DetectPreset::Long960 => ScaleTarget::MaxLongSide(960),
            DetectPreset::Long640 => ScaleTarget::MaxLongSide(640),
        }
    }
}
