//! # Barcode Preview
//!
//! The platform-neutral core of a live barcode scanning preview: choose a
//! preview size for the display surface, stream frames from a capture device,
//! and hand at most one frame at a time to a slow barcode detector while the
//! preview keeps running.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `preview`: Preview size selection for a display surface
//! - `capture`: The capture device contract and an image-directory replay device
//! - `processing`: The single-flight frame gate and still conversion
//! - `detect`: The detector contract, barcode formats and detection results
//! - `core`: Raw frame types
//! - `config`: Configuration management and validation
//! - `session`: Surface-driven session lifecycle
//!
//! ## Example
//!
//! ```rust,no_run
//! use barcode_preview::capture::ImageDirDevice;
//! use barcode_preview::detect::SnapshotDetector;
//! use barcode_preview::preview::TargetArea;
//! use barcode_preview::session::ScanSession;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = ScanSession::builder()
//!     .with_device(ImageDirDevice::new("frames", 30.0)?)
//!     .with_detector(SnapshotDetector::new("stills")?)
//!     .build()?;
//!
//! session.on_surface_created(TargetArea::new(1920, 1080)).await?;
//! session.start().await?;
//! let stats = session.run().await?;
//! session.on_surface_destroyed().await?;
//! println!("{} frames offered, {} detected", stats.offered, stats.dispatched);
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod core;
pub mod detect;
pub mod error;
pub mod preview;
pub mod processing;
pub mod session;

/// Re-export error types for convenience
pub use error::{
    HasRecoverySuggestion, HasSeverity, Recoverable, RecoveryStrategy, ScanError, ScanResult,
};

pub use capture::CaptureDevice;
pub use config::ScanConfig;
pub use detect::{BarcodeFormat, DetectedCode, Detection, Detector};
pub use preview::{Resolution, TargetArea, select_optimal};
pub use processing::{FrameGate, GateStats, Offer};
pub use session::{ScanSession, SessionState, SurfaceEvent};
