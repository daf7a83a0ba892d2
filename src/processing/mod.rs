//! # Processing Module
//!
//! The path a preview frame takes on its way to a detector: the single-flight
//! gate deciding whether it is processed at all, and the conversion into a
//! still image.

pub mod gate;
pub mod still;

pub use gate::{FrameGate, GatePermit, GateStats, Offer};
pub use still::{ConverterOptions, StillConverter, StillImage};
