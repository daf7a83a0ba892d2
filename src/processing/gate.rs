//! # Frame Gate
//!
//! Single-flight dispatch of preview frames to a detector.
//!
//! Detection is much slower than frame delivery. Rather than queueing frames
//! (and growing without bound) the gate sheds load: while one detection is in
//! flight every other offered frame is dropped. Nothing is buffered and
//! nothing is retried.
//!
//! ## Mechanics
//!
//! - Acceptance is a compare-and-swap on one atomic busy flag, so concurrent
//!   producers can never both see the gate idle and both dispatch.
//! - An accepted frame carries a [`GatePermit`] into the background task.
//!   The permit clears the flag when dropped, which happens exactly once
//!   whether the detection succeeds, fails, or panics.
//! - Conversion and detection run on the runtime's blocking pool, never on
//!   the thread that called [`FrameGate::offer`].

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::core::RawFrame;
use crate::detect::{BarcodeFormat, DetectedCode, Detection, Detector};
use crate::error::{ScanError, ScanResult};
use crate::processing::StillConverter;

/// Outcome of offering a frame to the gate.
#[derive(Debug)]
pub enum Offer {
    /// The frame was accepted; the handle resolves once detection finished
    /// and the gate is idle again.
    Dispatched(JoinHandle<()>),
    /// A detection was already in flight; the frame was discarded.
    Dropped,
}

impl Offer {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, Offer::Dispatched(_))
    }
}

/// Snapshot of gate counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateStats {
    /// Frames offered.
    pub offered: u64,
    /// Frames accepted for detection.
    pub dispatched: u64,
    /// Frames discarded because the gate was busy.
    pub dropped: u64,
    /// Dispatched frames whose conversion or detection failed.
    pub failed: u64,
    /// Dispatched frames whose detection finished successfully.
    pub completed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    offered: AtomicU64,
    dispatched: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
    completed: AtomicU64,
}

/// Exclusive right to run one detection. Releases the gate on drop.
#[derive(Debug)]
pub struct GatePermit {
    busy: Arc<AtomicBool>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Everything the background task needs, cloned out of the gate per dispatch.
struct DetectionJob {
    detector: Arc<dyn Detector>,
    converter: Arc<StillConverter>,
    formats: Arc<[BarcodeFormat]>,
    results: mpsc::UnboundedSender<Detection>,
    counters: Arc<Counters>,
}

impl DetectionJob {
    fn run(self, frame: RawFrame, permit: GatePermit) {
        let seq = frame.seq;
        let outcome = catch_unwind(AssertUnwindSafe(|| self.detect(&frame)));

        match outcome {
            Ok(Ok(codes)) => {
                self.counters.completed.fetch_add(1, Ordering::Relaxed);
                debug!(seq, codes = codes.len(), "detection finished");
                if !codes.is_empty() {
                    // A closed receiver means the host stopped listening; the
                    // result is dropped like any other.
                    let _ = self.results.send(Detection { seq, codes });
                }
            }
            Ok(Err(err)) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(seq, error = %err, "detection failed; frame dropped");
            }
            Err(_) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(seq, detector = self.detector.name(), "detector panicked; frame dropped");
            }
        }

        drop(permit);
    }

    fn detect(&self, frame: &RawFrame) -> ScanResult<Vec<DetectedCode>> {
        let still = self.converter.convert(frame)?;
        let codes = self.detector.detect(&still, &self.formats).map_err(|e| {
            ScanError::detection(self.detector.name(), format!("{e:#}"))
                .with_metadata("seq", frame.seq.to_string())
        })?;
        Ok(codes
            .into_iter()
            .filter(|code| self.formats.contains(&code.format))
            .collect())
    }
}

/// Single-flight gate in front of a detector.
pub struct FrameGate {
    busy: Arc<AtomicBool>,
    detector: Arc<dyn Detector>,
    converter: Arc<StillConverter>,
    formats: Arc<[BarcodeFormat]>,
    results: mpsc::UnboundedSender<Detection>,
    counters: Arc<Counters>,
    runtime: Handle,
}

impl FrameGate {
    /// Build a gate on the current tokio runtime.
    ///
    /// Codes found by the detector are sent to `results`, restricted to
    /// `formats`; stills without codes produce no message.
    pub fn new(
        detector: Arc<dyn Detector>,
        converter: StillConverter,
        formats: Vec<BarcodeFormat>,
        results: mpsc::UnboundedSender<Detection>,
    ) -> ScanResult<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            ScanError::external("tokio", e)
                .with_recovery_suggestion("Build the frame gate from within a tokio runtime")
        })?;
        Ok(Self::with_handle(runtime, detector, converter, formats, results))
    }

    /// Build a gate that dispatches onto `runtime`.
    pub fn with_handle(
        runtime: Handle,
        detector: Arc<dyn Detector>,
        converter: StillConverter,
        formats: Vec<BarcodeFormat>,
        results: mpsc::UnboundedSender<Detection>,
    ) -> Self {
        Self {
            busy: Arc::new(AtomicBool::new(false)),
            detector,
            converter: Arc::new(converter),
            formats: formats.into(),
            results,
            counters: Arc::new(Counters::default()),
            runtime,
        }
    }

    /// Offer a frame. Never blocks on detection.
    pub fn offer(&self, frame: RawFrame) -> Offer {
        self.counters.offered.fetch_add(1, Ordering::Relaxed);

        let Some(permit) = self.try_acquire() else {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            trace!(seq = frame.seq, "detection in flight; frame dropped");
            return Offer::Dropped;
        };
        self.counters.dispatched.fetch_add(1, Ordering::Relaxed);
        trace!(seq = frame.seq, "frame dispatched");

        let job = DetectionJob {
            detector: Arc::clone(&self.detector),
            converter: Arc::clone(&self.converter),
            formats: Arc::clone(&self.formats),
            results: self.results.clone(),
            counters: Arc::clone(&self.counters),
        };
        Offer::Dispatched(self.runtime.spawn_blocking(move || job.run(frame, permit)))
    }

    /// Whether a detection is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> GateStats {
        GateStats {
            offered: self.counters.offered.load(Ordering::Relaxed),
            dispatched: self.counters.dispatched.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
        }
    }

    fn try_acquire(&self) -> Option<GatePermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GatePermit {
                busy: Arc::clone(&self.busy),
            })
    }
}
