// # Image Directory Capture Device
//
// Replays the still images in a directory as a preview stream. Frames are
// delivered as RGB24 at the configured resolution and a fixed frame rate,
// in file name order.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use image::imageops::{self, FilterType};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info};

use super::CaptureDevice;
use crate::core::{PixelFormat, RawFrame};
use crate::preview::Resolution;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tif", "tiff", "webp"];

/// Capture device backed by a directory of images.
#[derive(Debug)]
pub struct ImageDirDevice {
    dir: PathBuf,
    fps: f64,
    declared: Option<Vec<Resolution>>,
    files: Vec<PathBuf>,
    discovered: Vec<Resolution>,
    configured: Option<Resolution>,
    ticker: Option<Interval>,
    cursor: usize,
    seq: u64,
    released: bool,
}

impl ImageDirDevice {
    /// Create a device replaying `dir` at `fps` frames per second.
    pub fn new(dir: impl Into<PathBuf>, fps: f64) -> Result<Self> {
        if !(fps.is_finite() && fps > 0.0) {
            bail!("Replay frame rate must be positive, got {}", fps);
        }
        Ok(Self {
            dir: dir.into(),
            fps,
            declared: None,
            files: Vec::new(),
            discovered: Vec::new(),
            configured: None,
            ticker: None,
            cursor: 0,
            seq: 0,
            released: false,
        })
    }

    /// Report `resolutions` as the supported preview sizes instead of the
    /// sizes of the images found in the directory.
    pub fn with_resolutions(mut self, resolutions: Vec<Resolution>) -> Self {
        self.declared = Some(resolutions);
        self
    }

    pub fn frame_count(&self) -> usize {
        self.files.len()
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.released {
            bail!("Device {} was released", self.dir.display());
        }
        Ok(())
    }
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Cannot read replay directory {}", dir.display()))?
    {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if path.is_file() && is_image {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn load_frame(path: &Path, seq: u64, size: Resolution) -> Result<RawFrame> {
    let mut rgb = image::open(path)
        .with_context(|| format!("Failed to decode {}", path.display()))?
        .to_rgb8();
    if rgb.dimensions() != (size.width, size.height) {
        rgb = imageops::resize(&rgb, size.width, size.height, FilterType::Triangle);
    }
    Ok(RawFrame::new(
        seq,
        size.width,
        size.height,
        PixelFormat::Rgb24,
        rgb.into_raw(),
    ))
}

#[async_trait]
impl CaptureDevice for ImageDirDevice {
    fn name(&self) -> &str {
        "image-dir"
    }

    async fn open(&mut self) -> Result<()> {
        self.ensure_usable()?;
        let files = list_images(&self.dir)?;
        if files.is_empty() {
            bail!("No images found in {}", self.dir.display());
        }

        // BTreeSet keeps the discovered list deterministic
        let mut sizes = BTreeSet::new();
        for file in &files {
            let (w, h) = image::image_dimensions(file)
                .with_context(|| format!("Failed to read dimensions of {}", file.display()))?;
            sizes.insert((w, h));
        }
        self.discovered = sizes.into_iter().map(|(w, h)| Resolution::new(w, h)).collect();
        self.files = files;

        info!(
            dir = %self.dir.display(),
            frames = self.files.len(),
            fps = self.fps,
            "replay device opened"
        );
        Ok(())
    }

    fn supported_resolutions(&self) -> Vec<Resolution> {
        self.declared
            .clone()
            .unwrap_or_else(|| self.discovered.clone())
    }

    async fn configure(&mut self, resolution: Resolution) -> Result<()> {
        self.ensure_usable()?;
        if self.ticker.is_some() {
            bail!("Cannot configure {} while streaming", self.name());
        }
        if resolution.width == 0 || resolution.height == 0 {
            bail!("Cannot configure an empty resolution {}", resolution);
        }
        self.configured = Some(resolution);
        debug!(%resolution, "replay device configured");
        Ok(())
    }

    async fn start_streaming(&mut self) -> Result<()> {
        self.ensure_usable()?;
        if self.configured.is_none() {
            bail!("{} must be configured before streaming", self.name());
        }
        let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / self.fps));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.ticker = Some(ticker);
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        let size = self
            .configured
            .ok_or_else(|| anyhow!("{} is not configured", self.name()))?;
        let ticker = self
            .ticker
            .as_mut()
            .ok_or_else(|| anyhow!("{} is not streaming", "image-dir"))?;

        let Some(path) = self.files.get(self.cursor).cloned() else {
            return Ok(None);
        };
        ticker.tick().await;

        self.cursor += 1;
        self.seq += 1;
        let seq = self.seq;
        let frame = tokio::task::spawn_blocking(move || load_frame(&path, seq, size))
            .await
            .context("Frame decoding task failed")??;
        Ok(Some(frame))
    }

    async fn stop(&mut self) -> Result<()> {
        self.ticker = None;
        Ok(())
    }

    async fn release(&mut self) -> Result<()> {
        self.ticker = None;
        self.files.clear();
        self.released = true;
        info!(dir = %self.dir.display(), "replay device released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_image(dir: &Path, name: &str, w: u32, h: u32) {
        RgbImage::from_pixel(w, h, Rgb([120, 40, 200]))
            .save(dir.join(name))
            .unwrap();
    }

    #[tokio::test]
    async fn replays_images_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "b.png", 64, 48);
        write_image(dir.path(), "a.png", 32, 24);
        std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let mut device = ImageDirDevice::new(dir.path(), 1000.0).unwrap();
        device.open().await.unwrap();
        assert_eq!(device.frame_count(), 2);
        assert_eq!(
            device.supported_resolutions(),
            vec![Resolution::new(32, 24), Resolution::new(64, 48)]
        );

        device.configure(Resolution::new(32, 24)).await.unwrap();
        device.start_streaming().await.unwrap();

        let first = device.next_frame().await.unwrap().unwrap();
        assert_eq!(first.seq, 1);
        assert_eq!(first.format, PixelFormat::Rgb24);
        assert_eq!((first.width, first.height), (32, 24));
        assert!(first.is_complete());

        // b.png is resized to the configured resolution
        let second = device.next_frame().await.unwrap().unwrap();
        assert_eq!((second.width, second.height), (32, 24));
        assert!(device.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn declared_resolutions_override_discovery() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "a.png", 8, 8);
        let mut device = ImageDirDevice::new(dir.path(), 30.0)
            .unwrap()
            .with_resolutions(vec![Resolution::new(640, 480)]);
        device.open().await.unwrap();
        assert_eq!(device.supported_resolutions(), vec![Resolution::new(640, 480)]);
    }

    #[tokio::test]
    async fn missing_directory_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut device = ImageDirDevice::new(dir.path().join("absent"), 30.0).unwrap();
        assert!(device.open().await.is_err());

        let empty = tempfile::tempdir().unwrap();
        let mut device = ImageDirDevice::new(empty.path(), 30.0).unwrap();
        assert!(device.open().await.is_err());
    }

    #[tokio::test]
    async fn streaming_requires_configuration() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "a.png", 8, 8);
        let mut device = ImageDirDevice::new(dir.path(), 30.0).unwrap();
        device.open().await.unwrap();
        assert!(device.start_streaming().await.is_err());
        assert!(device.next_frame().await.is_err());

        device.release().await.unwrap();
        assert!(device.configure(Resolution::new(8, 8)).await.is_err());
    }

    #[test]
    fn rejects_non_positive_fps() {
        assert!(ImageDirDevice::new("/tmp", 0.0).is_err());
        assert!(ImageDirDevice::new("/tmp", f64::NAN).is_err());
    }
}
