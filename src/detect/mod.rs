//! # Detection Module
//!
//! The contract between the scan core and a barcode detection service. The
//! service itself (a vendor vision library, a remote model, ...) is opaque:
//! it receives a still image and reports the codes it found. Calls are
//! synchronous and may take hundreds of milliseconds, which is why the frame
//! gate only ever runs one at a time and never on the frame producer's thread.

use std::fmt;

use anyhow::Result;

use crate::processing::StillImage;

pub mod snapshot;

pub use snapshot::SnapshotDetector;

/// Barcode symbologies a detector can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum BarcodeFormat {
    #[clap(name = "qr")]
    QrCode,
    #[clap(name = "data-matrix")]
    DataMatrix,
    #[clap(name = "aztec")]
    Aztec,
    #[clap(name = "pdf417")]
    Pdf417,
    #[clap(name = "ean13")]
    Ean13,
    #[clap(name = "ean8")]
    Ean8,
    #[clap(name = "upc-a")]
    UpcA,
    #[clap(name = "upc-e")]
    UpcE,
    #[clap(name = "code128")]
    Code128,
    #[clap(name = "code39")]
    Code39,
    #[clap(name = "code93")]
    Code93,
    #[clap(name = "codabar")]
    Codabar,
    #[clap(name = "itf")]
    Itf,
}

impl fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BarcodeFormat::QrCode => "QR_CODE",
            BarcodeFormat::DataMatrix => "DATA_MATRIX",
            BarcodeFormat::Aztec => "AZTEC",
            BarcodeFormat::Pdf417 => "PDF417",
            BarcodeFormat::Ean13 => "EAN_13",
            BarcodeFormat::Ean8 => "EAN_8",
            BarcodeFormat::UpcA => "UPC_A",
            BarcodeFormat::UpcE => "UPC_E",
            BarcodeFormat::Code128 => "CODE_128",
            BarcodeFormat::Code39 => "CODE_39",
            BarcodeFormat::Code93 => "CODE_93",
            BarcodeFormat::Codabar => "CODABAR",
            BarcodeFormat::Itf => "ITF",
        };
        f.write_str(name)
    }
}

/// One decoded symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedCode {
    pub format: BarcodeFormat,
    pub payload: String,
}

impl DetectedCode {
    pub fn new(format: BarcodeFormat, payload: impl Into<String>) -> Self {
        Self {
            format,
            payload: payload.into(),
        }
    }
}

/// Codes found in one still, delivered to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Sequence number of the frame the still was made from.
    pub seq: u64,
    pub codes: Vec<DetectedCode>,
}

/// A barcode detection service.
///
/// Implementations must be shareable with the background detection context;
/// the frame gate guarantees `detect` is never called concurrently by one
/// session.
pub trait Detector: Send + Sync + 'static {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Whether the underlying service loaded and can detect.
    ///
    /// A non-operational detector is still called; hosts decide whether to
    /// proceed.
    fn is_operational(&self) -> bool {
        true
    }

    /// Detect codes of the requested formats in `still`.
    fn detect(&self, still: &StillImage, formats: &[BarcodeFormat]) -> Result<Vec<DetectedCode>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_display_vendor_names() {
        assert_eq!(BarcodeFormat::QrCode.to_string(), "QR_CODE");
        assert_eq!(BarcodeFormat::DataMatrix.to_string(), "DATA_MATRIX");
        assert_eq!(BarcodeFormat::Ean13.to_string(), "EAN_13");
    }
}
