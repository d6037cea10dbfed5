use crate::capability::SolverError;
use crate::error::ConfigurationError;
use charuco_calib_core::ImageSize;

/// Failure of one calibration call.
///
/// None of these corrupt state: the previously stored result, if any, stays
/// readable.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigurationError),
    #[error(
        "detection must be run for the current board first ({stale_images} images hold results for another board)"
    )]
    DetectionRequired { stale_images: usize },
    #[error("not enough usable views: {included} included, {excluded} excluded")]
    InsufficientData { included: usize, excluded: usize },
    #[error("image {image_index} is {found}, expected {expected}")]
    ImageDimensionMismatch {
        image_index: usize,
        expected: ImageSize,
        found: ImageSize,
    },
    #[error("a calibration is already running")]
    AlreadyRunning,
    #[error("solver failed: {reason}")]
    SolverFailure { reason: String },
    #[error("calibration cancelled before the solve")]
    Cancelled,
}

impl CalibrationError {
    pub(crate) fn solver(err: &SolverError) -> Self {
        Self::SolverFailure {
            reason: err.to_string(),
        }
    }
}
