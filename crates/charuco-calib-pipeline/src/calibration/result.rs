use charuco_calib_core::{BoardSpec, ImageSize};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Camera pose of one contributing image, keyed by its collection index.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImagePose {
    pub image_index: usize,
    /// Rodrigues rotation vector, board to camera.
    pub rotation: Vector3<f64>,
    pub translation: Vector3<f64>,
}

/// Outcome of a successful calibration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// Camera matrix `[fx 0 cx; 0 fy cy; 0 0 1]`.
    pub intrinsics: Matrix3<f64>,
    pub distortion: Vec<f64>,
    /// One pose per contributing image, in `image_indices` order.
    pub poses: Vec<ImagePose>,
    /// RMS reprojection error in pixels.
    pub reprojection_error: f64,
    pub image_indices: Vec<usize>,
    pub board: BoardSpec,
    pub image_size: ImageSize,
}

impl CalibrationResult {
    #[inline]
    pub fn fx(&self) -> f64 {
        self.intrinsics[(0, 0)]
    }

    #[inline]
    pub fn fy(&self) -> f64 {
        self.intrinsics[(1, 1)]
    }

    /// Principal point `(cx, cy)`.
    #[inline]
    pub fn principal_point(&self) -> (f64, f64) {
        (self.intrinsics[(0, 2)], self.intrinsics[(1, 2)])
    }

    /// Pose solved for collection image `image_index`, if it contributed.
    pub fn pose_for(&self, image_index: usize) -> Option<&ImagePose> {
        self.poses.iter().find(|p| p.image_index == image_index)
    }
}

/// Lifecycle of a [`CalibrationOrchestrator`](super::CalibrationOrchestrator).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStatus {
    #[default]
    NotRun,
    Running,
    Succeeded,
    Failed,
}

impl CalibrationStatus {
    #[inline]
    pub fn is_running(self) -> bool {
        self == Self::Running
    }

    /// `true` once a call has finished, successfully or not.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for CalibrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotRun => "not run",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}
