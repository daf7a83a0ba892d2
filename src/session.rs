//! # Scan Session
//!
//! Owns one capture device and one frame gate (and through it the detector)
//! for the lifetime of a display surface. The host forwards its surface
//! lifecycle as events and the session moves through explicit states:
//!
//! ```text
//!  Uninitialized ──created──▶ Configured ──start──▶ Streaming
//!        │                     │   ▲ changed           │ ▲ changed
//!        │                     │   └───────┘           │ └───────┘
//!        └──────────destroyed──┴──────────destroyed────┴──▶ Stopped
//! ```
//!
//! - `created` opens the device, selects a preview size for the surface and
//!   configures the device.
//! - `changed` stops streaming if needed, reselects, reconfigures and resumes.
//! - `destroyed` stops streaming, waits for the in-flight detection to
//!   finish (it is never cancelled) and releases the device exactly once.
//!
//! Any device failure while opening, configuring or starting is fatal: the
//! device is released, the session ends in `Stopped` and the error is
//! returned as [`ScanError::DeviceUnavailable`].

// Standard library imports
use std::fmt;
use std::sync::Arc;

// External crate imports
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

// Internal module imports
use crate::capture::CaptureDevice;
use crate::config::ScanConfig;
use crate::detect::{Detection, Detector};
use crate::error::{ScanError, ScanResult};
use crate::preview::{Resolution, TargetArea, select_optimal};
use crate::processing::{FrameGate, GateStats, Offer, StillConverter};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Configured,
    Streaming,
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Configured => "configured",
            SessionState::Streaming => "streaming",
            SessionState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Display surface lifecycle events forwarded by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    Created(TargetArea),
    Changed(TargetArea),
    Destroyed,
}

/// What happened to one pumped frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpOutcome {
    pub seq: u64,
    /// Whether the frame went to the detector (`false`: dropped by the gate).
    pub dispatched: bool,
}

/// A capture device, a frame gate and the state tying them to a surface.
pub struct ScanSession {
    state: SessionState,
    device: Option<Box<dyn CaptureDevice>>,
    device_name: String,
    gate: FrameGate,
    config: ScanConfig,
    resolution: Option<Resolution>,
    in_flight: Option<JoinHandle<()>>,
    detections: Option<mpsc::UnboundedReceiver<Detection>>,
}

impl ScanSession {
    /// Create a new scan session using the builder pattern.
    pub fn builder() -> ScanSessionBuilder {
        ScanSessionBuilder::new()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The preview resolution the device is configured with, if any.
    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn stats(&self) -> GateStats {
        self.gate.stats()
    }

    /// Whether a detection is in flight.
    pub fn is_detecting(&self) -> bool {
        self.gate.is_busy()
    }

    /// Take the receiving end of the detection channel. Returns `None` after
    /// the first call.
    pub fn take_detections(&mut self) -> Option<mpsc::UnboundedReceiver<Detection>> {
        self.detections.take()
    }

    /// Apply a surface lifecycle event.
    pub async fn handle(&mut self, event: SurfaceEvent) -> ScanResult<()> {
        match event {
            SurfaceEvent::Created(target) => self.on_surface_created(target).await,
            SurfaceEvent::Changed(target) => self.on_surface_changed(target).await,
            SurfaceEvent::Destroyed => self.on_surface_destroyed().await,
        }
    }

    /// Open the device and configure it for `target`.
    pub async fn on_surface_created(&mut self, target: TargetArea) -> ScanResult<()> {
        self.expect_state(&[SessionState::Uninitialized], "surface_created")?;

        let opened = match self.device.as_mut() {
            Some(device) => device.open().await,
            None => return Err(self.state_error("surface_created", "no capture device")),
        };
        if let Err(e) = opened {
            // Nothing was acquired, so there is nothing to release.
            self.device = None;
            self.state = SessionState::Stopped;
            return Err(self.device_error("open", e));
        }
        info!(device = %self.device_name, "capture device opened");

        let resolution = match self.select(target) {
            Ok(resolution) => resolution,
            Err(e) => return Err(self.abort(e).await),
        };
        self.configure(resolution).await?;
        self.state = SessionState::Configured;
        Ok(())
    }

    /// Start streaming frames from the configured device.
    pub async fn start(&mut self) -> ScanResult<()> {
        self.expect_state(&[SessionState::Configured], "start")?;
        self.start_device().await?;
        self.state = SessionState::Streaming;
        info!(resolution = ?self.resolution, "streaming started");
        Ok(())
    }

    /// Reconfigure for a resized surface, resuming streaming if it was active.
    pub async fn on_surface_changed(&mut self, target: TargetArea) -> ScanResult<()> {
        self.expect_state(
            &[SessionState::Configured, SessionState::Streaming],
            "surface_changed",
        )?;
        let was_streaming = self.state == SessionState::Streaming;

        if was_streaming {
            if let Some(device) = self.device.as_mut() {
                // Stopping a preview that never started is harmless.
                if let Err(e) = device.stop().await {
                    warn!(error = %format!("{e:#}"), "ignoring failure to stop preview");
                }
            }
            self.state = SessionState::Configured;
        }

        let resolution = match self.select(target) {
            Ok(resolution) => resolution,
            Err(e) => return Err(self.abort(e).await),
        };
        self.configure(resolution).await?;

        if was_streaming {
            self.start_device().await?;
            self.state = SessionState::Streaming;
        }
        Ok(())
    }

    /// Pull one frame from the device and offer it to the gate.
    ///
    /// Returns `None` once the device has no more frames.
    pub async fn pump(&mut self) -> ScanResult<Option<PumpOutcome>> {
        self.expect_state(&[SessionState::Streaming], "pump")?;
        let Some(device) = self.device.as_mut() else {
            return Err(self.state_error("pump", "no capture device"));
        };

        let frame = match device.next_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(None),
            Err(e) => {
                return Err(ScanError::frame_capture(format!("{e:#}"))
                    .with_operation("next_frame")
                    .with_metadata("device", self.device_name.clone()));
            }
        };

        let seq = frame.seq;
        let dispatched = match self.gate.offer(frame) {
            Offer::Dispatched(handle) => {
                self.in_flight = Some(handle);
                true
            }
            Offer::Dropped => false,
        };
        Ok(Some(PumpOutcome { seq, dispatched }))
    }

    /// Pump frames until the device runs out, then wait for the last
    /// detection to finish.
    pub async fn run(&mut self) -> ScanResult<GateStats> {
        while self.pump().await?.is_some() {}
        self.wait_idle().await;
        let stats = self.stats();
        info!(
            offered = stats.offered,
            dispatched = stats.dispatched,
            dropped = stats.dropped,
            failed = stats.failed,
            "frame stream ended"
        );
        Ok(stats)
    }

    /// Wait for the in-flight detection, if any.
    pub async fn wait_idle(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            // Panics are caught inside the task; a join error here can only
            // be a runtime shutdown.
            if let Err(e) = handle.await {
                warn!(error = %e, "detection task did not complete");
            }
        }
    }

    /// Stop the device, wait for the in-flight detection and release the
    /// device. Safe to call in any state, repeatedly.
    pub async fn on_surface_destroyed(&mut self) -> ScanResult<()> {
        if self.state == SessionState::Stopped {
            debug!("surface destroyed on a stopped session");
            return Ok(());
        }
        self.teardown().await;
        Ok(())
    }

    fn select(&self, target: TargetArea) -> ScanResult<Resolution> {
        let candidates = self
            .device
            .as_ref()
            .map(|device| device.supported_resolutions())
            .unwrap_or_default();

        if let Some(resolution) = select_optimal(&candidates, target) {
            debug!(%target, %resolution, candidates = candidates.len(), "preview size selected");
            return Ok(resolution);
        }
        match self.config.default_resolution {
            Some(resolution) => {
                warn!(%resolution, "device reported no preview sizes; using default");
                Ok(resolution)
            }
            None => Err(ScanError::config(
                "default_resolution",
                "none",
                "device reported no preview sizes and no default is configured",
            )
            .with_recovery_suggestion("Set a default preview resolution")),
        }
    }

    async fn configure(&mut self, resolution: Resolution) -> ScanResult<()> {
        let configured = match self.device.as_mut() {
            Some(device) => device.configure(resolution).await,
            None => return Err(self.state_error("configure", "no capture device")),
        };
        if let Err(e) = configured {
            let err = self.device_error("configure", e);
            return Err(self.abort(err).await);
        }
        self.resolution = Some(resolution);
        info!(%resolution, "preview configured");
        Ok(())
    }

    async fn start_device(&mut self) -> ScanResult<()> {
        let started = match self.device.as_mut() {
            Some(device) => device.start_streaming().await,
            None => return Err(self.state_error("start", "no capture device")),
        };
        if let Err(e) = started {
            let err = self.device_error("start_streaming", e);
            return Err(self.abort(err).await);
        }
        Ok(())
    }

    /// Tear the session down and hand back `err`.
    async fn abort(&mut self, err: ScanError) -> ScanError {
        warn!(error = %err, "session aborted");
        self.teardown().await;
        err
    }

    async fn teardown(&mut self) {
        if let Some(mut device) = self.device.take() {
            if self.state == SessionState::Streaming {
                if let Err(e) = device.stop().await {
                    warn!(error = %format!("{e:#}"), "failed to stop preview");
                }
            }
            // No detection result may outlive the session.
            self.wait_idle().await;
            if let Err(e) = device.release().await {
                warn!(error = %format!("{e:#}"), "failed to release capture device");
            }
            info!(device = %self.device_name, "capture device released");
        }
        self.state = SessionState::Stopped;
    }

    fn expect_state(&self, allowed: &[SessionState], operation: &str) -> ScanResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            let expected: Vec<String> = allowed.iter().map(ToString::to_string).collect();
            Err(self.state_error(operation, format!("requires {}", expected.join(" or "))))
        }
    }

    fn state_error(&self, operation: &str, reason: impl Into<String>) -> ScanError {
        ScanError::state(self.state.to_string(), operation, reason)
    }

    fn device_error(&self, operation: &str, source: anyhow::Error) -> ScanError {
        ScanError::device_unavailable(self.device_name.clone(), format!("{source:#}"))
            .with_operation(operation)
            .with_recovery_suggestion("Close other applications using the camera and restart the session")
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        if self.device.is_some() {
            warn!(
                device = %self.device_name,
                state = %self.state,
                "scan session dropped without surface_destroyed; device not released"
            );
        }
    }
}

/// Builder for scan sessions.
pub struct ScanSessionBuilder {
    device: Option<Box<dyn CaptureDevice>>,
    detector: Option<Arc<dyn Detector>>,
    config: ScanConfig,
}

impl ScanSessionBuilder {
    pub fn new() -> Self {
        Self {
            device: None,
            detector: None,
            config: ScanConfig::default(),
        }
    }

    /// Set the capture device the session owns.
    pub fn with_device<C: CaptureDevice + 'static>(mut self, device: C) -> Self {
        self.device = Some(Box::new(device));
        self
    }

    /// Set the detection service.
    pub fn with_detector<D: Detector>(mut self, detector: D) -> Self {
        self.detector = Some(Arc::new(detector));
        self
    }

    /// Set a detection service that is shared with the caller.
    pub fn with_shared_detector(mut self, detector: Arc<dyn Detector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the session. Must be called from within a tokio runtime.
    pub fn build(self) -> ScanResult<ScanSession> {
        self.config
            .validate()
            .map_err(|reason| ScanError::validation("scan_config", reason, format!("{:?}", self.config)))?;

        let device = self
            .device
            .ok_or_else(|| ScanError::config("device", "none", "No capture device specified"))?;
        let detector = self
            .detector
            .ok_or_else(|| ScanError::config("detector", "none", "No detector specified"))?;

        if !detector.is_operational() {
            warn!(detector = detector.name(), "detector is not operational");
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let gate = FrameGate::new(
            detector,
            StillConverter::new(self.config.to_converter_options()),
            self.config.formats.clone(),
            tx,
        )?;

        Ok(ScanSession {
            state: SessionState::Uninitialized,
            device_name: device.name().to_string(),
            device: Some(device),
            gate,
            config: self.config,
            resolution: None,
            in_flight: None,
            detections: Some(rx),
        })
    }
}

impl Default for ScanSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
