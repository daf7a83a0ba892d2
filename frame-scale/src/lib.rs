// SPDX-License-Identifier: MIT
//! # frame-scale: Detector-Friendly Still Scaling
//!
//! Barcode detectors are far slower than the preview frame rate, and their
//! cost grows with pixel count. This crate decides how large a still image
//! handed to a detector should be, and performs the resize on the CPU.
//!
//! ## Key Components
//!
//! - [`presets`]: Scale plan computation and the detector presets exposed on the CLI
//! - [`cpu`]: RGB8 resizing built on fast_image_resize (SIMD-accelerated)
//!
//! ## Usage Example
//!
//! ```rust
//! use frame_scale::presets::{build_plan, DetectPreset, Size};
//!
//! let plan = build_plan(Size { w: 1920, h: 1080 }, DetectPreset::Long640.to_target());
//! assert_eq!((plan.out.w, plan.out.h), (640, 360));
//! ```

pub mod cpu;
pub mod presets;
