//! Calibration state machine on top of aggregated detections.

mod error;
mod orchestrator;
mod params;
mod result;

pub use error::CalibrationError;
pub use orchestrator::CalibrationOrchestrator;
pub use params::CalibrationParams;
pub use result::{CalibrationResult, CalibrationStatus, ImagePose};
