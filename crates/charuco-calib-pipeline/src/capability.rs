//! Contracts of the two external numerical capabilities.
//!
//! Corner/marker detection and the nonlinear calibration solve are black
//! boxes to the pipeline. Implementations typically wrap a native library.

use charuco_calib_core::{BoardSpec, DetectionResult, GrayImageView, ImageSize};
use nalgebra::{Matrix3, Point2, Vector3};
use serde::{Deserialize, Serialize};

/// Detector-side failure for one image.
///
/// The detection loop records any of these as `NotDetected`; they never
/// abort a pass.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardDetectError {
    #[error("malformed board geometry: {0}")]
    MalformedGeometry(String),
    #[error("detector internal error: {0}")]
    Internal(String),
}

/// Finds a ChArUco board in a grayscale image.
///
/// Must not retain or mutate the buffer and must be callable repeatedly with
/// different boards on the same buffer. "Nothing found" is
/// `Ok(DetectionResult::NotDetected)`, not an error.
pub trait BoardDetector {
    fn detect(
        &self,
        image: &GrayImageView<'_>,
        board: &BoardSpec,
    ) -> Result<DetectionResult, BoardDetectError>;
}

impl<F> BoardDetector for F
where
    F: Fn(&GrayImageView<'_>, &BoardSpec) -> Result<DetectionResult, BoardDetectError>,
{
    fn detect(
        &self,
        image: &GrayImageView<'_>,
        board: &BoardSpec,
    ) -> Result<DetectionResult, BoardDetectError> {
        self(image, board)
    }
}

/// Camera pose of one view: Rodrigues rotation vector and translation,
/// board frame to camera frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub rotation: Vector3<f64>,
    pub translation: Vector3<f64>,
}

impl Pose {
    pub fn is_finite(&self) -> bool {
        self.rotation.iter().all(|v| v.is_finite())
            && self.translation.iter().all(|v| v.is_finite())
    }
}

/// Terminal outcome of a successful solve.
///
/// `poses[k]` belongs to the `k`-th entry of the correspondence sets the
/// solver was given.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverOutput {
    pub intrinsics: Matrix3<f64>,
    pub distortion: Vec<f64>,
    pub poses: Vec<Pose>,
    pub reprojection_error: f64,
}

/// Typed solver failure.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("solver did not converge after {iterations} iterations")]
    NotConverged { iterations: usize },
    #[error("singular system")]
    Singular,
    #[error("invalid solver input: {0}")]
    InvalidInput(String),
    #[error("solver internal error: {0}")]
    Internal(String),
}

/// Recovers intrinsics, distortion and per-view poses from ChArUco
/// correspondences.
///
/// `corners_per_image[k]` and `ids_per_image[k]` are index-aligned and
/// describe the same view. May take seconds to minutes; reports exactly one
/// terminal outcome.
pub trait CalibrationSolver {
    fn calibrate(
        &self,
        corners_per_image: &[Vec<Point2<f32>>],
        ids_per_image: &[Vec<u32>],
        board: &BoardSpec,
        image_size: ImageSize,
    ) -> Result<SolverOutput, SolverError>;
}

impl<T: CalibrationSolver + ?Sized> CalibrationSolver for &T {
    fn calibrate(
        &self,
        corners_per_image: &[Vec<Point2<f32>>],
        ids_per_image: &[Vec<u32>],
        board: &BoardSpec,
        image_size: ImageSize,
    ) -> Result<SolverOutput, SolverError> {
        (**self).calibrate(corners_per_image, ids_per_image, board, image_size)
    }
}
