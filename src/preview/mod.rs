//! # Preview Module
//!
//! Resolution types and preview-size selection.

pub mod selector;

pub use selector::{ASPECT_TOLERANCE, Resolution, TargetArea, select_optimal};
