use charuco_calib_core::BoardSpec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What happened to one image during a detection pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DetectionStatus {
    Detected {
        corners: usize,
        markers: usize,
    },
    /// No board found. `reason` is set when the detector failed or returned
    /// inconsistent data rather than plainly finding nothing.
    NotDetected {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    LoadFailed {
        error: String,
    },
    /// Skipped because the pass was cancelled before reaching this image.
    Cancelled,
}

impl DetectionStatus {
    /// `true` for detections that aggregation will use.
    #[inline]
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Detected { corners, .. } if *corners > 0)
    }
}

/// Per-image entry of a [`DetectionReport`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageOutcome {
    pub index: usize,
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: DetectionStatus,
}

/// Audit trail of one detection pass, one entry per collection image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub board: BoardSpec,
    pub outcomes: Vec<ImageOutcome>,
    /// Stale records (other board geometry) dropped before the pass.
    #[serde(default)]
    pub invalidated: usize,
    #[serde(default)]
    pub cancelled: bool,
}

impl DetectionReport {
    pub fn new(board: BoardSpec) -> Self {
        Self {
            board,
            outcomes: Vec::new(),
            invalidated: 0,
            cancelled: false,
        }
    }

    /// Images with a `Detected` outcome, degenerate ones included.
    pub fn detected_count(&self) -> usize {
        self.count(|s| matches!(s, DetectionStatus::Detected { .. }))
    }

    /// Images whose detection carries at least one corner.
    pub fn usable_count(&self) -> usize {
        self.count(DetectionStatus::is_usable)
    }

    pub fn not_detected_count(&self) -> usize {
        self.count(|s| matches!(s, DetectionStatus::NotDetected { .. }))
    }

    pub fn load_failed_count(&self) -> usize {
        self.count(|s| matches!(s, DetectionStatus::LoadFailed { .. }))
    }

    pub fn cancelled_count(&self) -> usize {
        self.count(|s| matches!(s, DetectionStatus::Cancelled))
    }

    fn count(&self, pred: impl Fn(&DetectionStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}
