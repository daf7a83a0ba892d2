// Snapshot detection service.
//
// Writes every still it is handed to a directory and reports no codes. Used
// by the replay CLI to inspect exactly what a real detector would receive.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use super::{BarcodeFormat, DetectedCode, Detector};
use crate::processing::StillImage;

/// Saves each still as `still-{seq:06}.jpg` under a directory.
#[derive(Debug)]
pub struct SnapshotDetector {
    dir: PathBuf,
}

impl SnapshotDetector {
    /// Create the detector, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create snapshot directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the still with sequence number `seq` is written to.
    pub fn path_for(&self, seq: u64) -> PathBuf {
        self.dir.join(format!("still-{:06}.jpg", seq))
    }
}

impl Detector for SnapshotDetector {
    fn name(&self) -> &str {
        "snapshot"
    }

    fn is_operational(&self) -> bool {
        self.dir.is_dir()
    }

    fn detect(&self, still: &StillImage, _formats: &[BarcodeFormat]) -> Result<Vec<DetectedCode>> {
        let path = self.path_for(still.seq);
        still
            .image
            .save(&path)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        debug!(seq = still.seq, path = %path.display(), "wrote snapshot");
        Ok(Vec::new())
    }
}
