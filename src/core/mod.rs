//! # Core Types Module
//!
//! Frame types shared by capture devices, the frame gate and still conversion.

pub mod frame;

pub use frame::{PixelFormat, RawFrame};
