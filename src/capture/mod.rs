// # Capture Module
//
// The capture device contract a scan session drives, plus the image-directory
// device used for replay.

use anyhow::Result;
use async_trait::async_trait;

use crate::core::RawFrame;
use crate::preview::Resolution;

pub mod image_dir;

pub use image_dir::ImageDirDevice;

/// A camera (or anything that behaves like one).
///
/// Sessions call these in a fixed order: `open`, `supported_resolutions`,
/// `configure`, `start_streaming`, then `next_frame` until it yields `None`
/// or the host stops the session, then `stop` and finally `release`.
/// `configure` and `start_streaming` may be repeated after a `stop` when
/// the display surface changes.
#[async_trait]
pub trait CaptureDevice: Send {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Acquire the device. Failure is fatal to the session.
    async fn open(&mut self) -> Result<()>;

    /// Preview resolutions the device can deliver, in device order.
    fn supported_resolutions(&self) -> Vec<Resolution>;

    /// Set the preview resolution for subsequent streaming.
    async fn configure(&mut self, resolution: Resolution) -> Result<()>;

    /// Begin delivering frames.
    async fn start_streaming(&mut self) -> Result<()>;

    /// Wait for the next frame at the device's own cadence. `None` means
    /// the device has no more frames to deliver.
    async fn next_frame(&mut self) -> Result<Option<RawFrame>>;

    /// Stop delivering frames. The device stays acquired.
    async fn stop(&mut self) -> Result<()>;

    /// Give the device back. No other method is called afterwards.
    async fn release(&mut self) -> Result<()>;
}
