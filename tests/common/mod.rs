//! Common test utilities shared by the integration tests.
//!
//! Provides a scripted capture device that records the calls a session makes,
//! detectors with controllable behaviour, and frame builders.

#![allow(dead_code)]

pub mod mock_device {
    use std::sync::{Arc, Mutex};

    use anyhow::{Result, bail};
    use async_trait::async_trait;
    use barcode_preview::capture::CaptureDevice;
    use barcode_preview::core::RawFrame;
    use barcode_preview::preview::Resolution;

    /// Calls made on a [`MockDevice`], shared with the test.
    #[derive(Debug, Default)]
    pub struct DeviceLog {
        calls: Mutex<Vec<&'static str>>,
        configured: Mutex<Vec<Resolution>>,
    }

    impl DeviceLog {
        pub fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        pub fn count(&self, call: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
        }

        pub fn configured(&self) -> Vec<Resolution> {
            self.configured.lock().unwrap().clone()
        }

        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }
    }

    /// Capture device delivering `frames` small grey frames as fast as asked.
    pub struct MockDevice {
        log: Arc<DeviceLog>,
        resolutions: Vec<Resolution>,
        frames: u64,
        fail_open: bool,
        fail_configure: bool,
        fail_frame: Option<u64>,
        size: Option<Resolution>,
        streaming: bool,
        seq: u64,
    }

    impl MockDevice {
        pub fn new(resolutions: Vec<Resolution>, frames: u64) -> (Self, Arc<DeviceLog>) {
            let log = Arc::new(DeviceLog::default());
            let device = Self {
                log: Arc::clone(&log),
                resolutions,
                frames,
                fail_open: false,
                fail_configure: false,
                fail_frame: None,
                size: None,
                streaming: false,
                seq: 0,
            };
            (device, log)
        }

        /// Make `open` fail as if another process held the camera.
        pub fn failing_open(mut self) -> Self {
            self.fail_open = true;
            self
        }

        pub fn failing_configure(mut self) -> Self {
            self.fail_configure = true;
            self
        }

        /// Make delivery of frame `seq` fail; later frames arrive normally.
        pub fn failing_frame(mut self, seq: u64) -> Self {
            self.fail_frame = Some(seq);
            self
        }
    }

    #[async_trait]
    impl CaptureDevice for MockDevice {
        fn name(&self) -> &str {
            "mock"
        }

        async fn open(&mut self) -> Result<()> {
            self.log.record("open");
            if self.fail_open {
                bail!("camera in use");
            }
            Ok(())
        }

        fn supported_resolutions(&self) -> Vec<Resolution> {
            self.resolutions.clone()
        }

        async fn configure(&mut self, resolution: Resolution) -> Result<()> {
            self.log.record("configure");
            if self.fail_configure {
                bail!("parameters rejected");
            }
            if self.streaming {
                bail!("configured while streaming");
            }
            self.log.configured.lock().unwrap().push(resolution);
            self.size = Some(resolution);
            Ok(())
        }

        async fn start_streaming(&mut self) -> Result<()> {
            self.log.record("start");
            self.streaming = true;
            Ok(())
        }

        async fn next_frame(&mut self) -> Result<Option<RawFrame>> {
            if !self.streaming {
                bail!("not streaming");
            }
            if self.seq >= self.frames {
                return Ok(None);
            }
            tokio::task::yield_now().await;
            self.seq += 1;
            if self.fail_frame == Some(self.seq) {
                bail!("frame {} lost: buffer overrun", self.seq);
            }
            // Keep frames small whatever the configured preview size is.
            Ok(Some(super::test_frames::gray(self.seq, 16, 12)))
        }

        async fn stop(&mut self) -> Result<()> {
            self.log.record("stop");
            self.streaming = false;
            Ok(())
        }

        async fn release(&mut self) -> Result<()> {
            self.log.record("release");
            self.streaming = false;
            Ok(())
        }
    }

    pub fn res(width: u32, height: u32) -> Resolution {
        Resolution::new(width, height)
    }
}

pub mod detectors {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, mpsc};

    use anyhow::{Result, bail};
    use barcode_preview::detect::{BarcodeFormat, DetectedCode, Detector};
    use barcode_preview::processing::StillImage;

    /// Blocks each call until the test sends on the paired sender.
    pub struct HeldDetector {
        release: Mutex<mpsc::Receiver<()>>,
        calls: AtomicUsize,
        codes: Vec<DetectedCode>,
    }

    impl HeldDetector {
        pub fn new(codes: Vec<DetectedCode>) -> (Arc<Self>, mpsc::Sender<()>) {
            let (tx, rx) = mpsc::channel();
            let detector = Arc::new(Self {
                release: Mutex::new(rx),
                calls: AtomicUsize::new(0),
                codes,
            });
            (detector, tx)
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Detector for HeldDetector {
        fn name(&self) -> &str {
            "held"
        }

        fn detect(&self, _still: &StillImage, _formats: &[BarcodeFormat]) -> Result<Vec<DetectedCode>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.release.lock().unwrap().recv()?;
            Ok(self.codes.clone())
        }
    }

    /// Returns the same codes immediately.
    #[derive(Default)]
    pub struct StaticDetector {
        codes: Vec<DetectedCode>,
        calls: AtomicUsize,
    }

    impl StaticDetector {
        pub fn new(codes: Vec<DetectedCode>) -> Arc<Self> {
            Arc::new(Self {
                codes,
                calls: AtomicUsize::new(0),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Detector for StaticDetector {
        fn name(&self) -> &str {
            "static"
        }

        fn detect(&self, _still: &StillImage, _formats: &[BarcodeFormat]) -> Result<Vec<DetectedCode>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.codes.clone())
        }
    }

    /// Always reports a detection failure.
    #[derive(Default)]
    pub struct FailingDetector;

    impl Detector for FailingDetector {
        fn name(&self) -> &str {
            "failing"
        }

        fn detect(&self, _still: &StillImage, _formats: &[BarcodeFormat]) -> Result<Vec<DetectedCode>> {
            bail!("model not loaded")
        }
    }

    /// Panics on every call.
    #[derive(Default)]
    pub struct PanickingDetector;

    impl Detector for PanickingDetector {
        fn name(&self) -> &str {
            "panicking"
        }

        fn detect(&self, _still: &StillImage, _formats: &[BarcodeFormat]) -> Result<Vec<DetectedCode>> {
            panic!("detector crashed")
        }
    }

    /// Reports itself as not operational but otherwise works.
    #[derive(Default)]
    pub struct UnloadedDetector;

    impl Detector for UnloadedDetector {
        fn name(&self) -> &str {
            "unloaded"
        }

        fn is_operational(&self) -> bool {
            false
        }

        fn detect(&self, _still: &StillImage, _formats: &[BarcodeFormat]) -> Result<Vec<DetectedCode>> {
            Ok(Vec::new())
        }
    }

    pub fn qr(payload: &str) -> DetectedCode {
        DetectedCode::new(BarcodeFormat::QrCode, payload)
    }
}

pub mod test_frames {
    use barcode_preview::core::{PixelFormat, RawFrame};

    /// Uniform grey frame.
    pub fn gray(seq: u64, width: u32, height: u32) -> RawFrame {
        RawFrame::new(
            seq,
            width,
            height,
            PixelFormat::Gray8,
            vec![128; (width * height) as usize],
        )
    }

    /// NV21 frame with a mid-grey luma plane and neutral chroma.
    pub fn nv21(seq: u64, width: u32, height: u32) -> RawFrame {
        let len = PixelFormat::Nv21.frame_len(width, height);
        let luma = (width * height) as usize;
        let mut data = vec![128u8; len];
        data[..luma].fill(100);
        RawFrame::new(seq, width, height, PixelFormat::Nv21, data)
    }
}
