//! # Scan Configuration
//!
//! Parameters for a scan session, shared by the CLI and embedding hosts.
//!
//! | Parameter | Type | Range | Description |
//! |-----------|------|-------|-------------|
//! | `jpeg_quality` | `Option<u8>` | 1-100 | Quality of the JPEG round-trip applied to stills, `None` to skip it |
//! | `detect_preset` | `DetectPreset` | native, long1280, long960, long640 | Downscale applied before detection |
//! | `default_resolution` | `Option<Resolution>` | positive sides | Used when a device lists no preview sizes |
//! | `formats` | `Vec<BarcodeFormat>` | non-empty | Symbologies the detector is asked for |
//!
//! ## Examples
//!
//! ```rust
//! use barcode_preview::config::ScanConfig;
//!
//! let config = ScanConfig::default();
//! assert_eq!(config.jpeg_quality, Some(50));
//! assert!(config.validate().is_ok());
//! ```

use frame_scale::presets::DetectPreset;

use crate::detect::BarcodeFormat;
use crate::preview::Resolution;
use crate::processing::ConverterOptions;

/// Configuration for a scan session.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// JPEG quality used when round-tripping stills before detection.
    ///
    /// Preview frames are compressed and decoded again before the detector
    /// sees them, which also smooths sensor noise. `None` hands the decoded
    /// preview pixels to the detector unchanged.
    pub jpeg_quality: Option<u8>,

    /// Downscale preset applied to stills before detection.
    pub detect_preset: DetectPreset,

    /// Preview resolution to configure when the device lists no sizes.
    ///
    /// Without a default such a session cannot be configured.
    pub default_resolution: Option<Resolution>,

    /// Symbologies requested from the detector.
    pub formats: Vec<BarcodeFormat>,
}

impl Default for ScanConfig {
    /// Defaults:
    /// - `jpeg_quality`: 50
    /// - `detect_preset`: native resolution
    /// - `default_resolution`: none
    /// - `formats`: Data Matrix and QR code
    fn default() -> Self {
        Self {
            jpeg_quality: Some(50),
            detect_preset: DetectPreset::Native,
            default_resolution: None,
            formats: vec![BarcodeFormat::DataMatrix, BarcodeFormat::QrCode],
        }
    }
}

impl ScanConfig {
    pub fn new(
        jpeg_quality: Option<u8>,
        detect_preset: DetectPreset,
        default_resolution: Option<Resolution>,
        formats: Vec<BarcodeFormat>,
    ) -> Self {
        Self {
            jpeg_quality,
            detect_preset,
            default_resolution,
            formats,
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(quality) = self.jpeg_quality {
            if !(1..=100).contains(&quality) {
                return Err("JPEG quality must be between 1 and 100".to_string());
            }
        }
        if let Some(resolution) = self.default_resolution {
            if resolution.width == 0 || resolution.height == 0 {
                return Err("Default resolution must have positive sides".to_string());
            }
        }
        if self.formats.is_empty() {
            return Err("At least one barcode format must be requested".to_string());
        }
        Ok(())
    }

    /// Options for the still converter.
    pub fn to_converter_options(&self) -> ConverterOptions {
        ConverterOptions {
            jpeg_quality: self.jpeg_quality,
            detect_preset: self.detect_preset,
        }
    }
}
