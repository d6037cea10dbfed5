//! Detection and calibration orchestration for ChArUco image sets.
//!
//! The pipeline has three stages:
//!
//! 1. [`DetectionOrchestrator::run_detection`] runs a [`BoardDetector`] over
//!    every image of an [`ImageCollection`] and records the outcome on each
//!    image, tied to the board it was produced under.
//! 2. [`aggregate`] filters the usable detections into index-aligned
//!    correspondence sets.
//! 3. [`CalibrationOrchestrator::run_calibration`] feeds those sets to a
//!    [`CalibrationSolver`] and keeps the latest [`CalibrationResult`].
//!
//! Corner detection and the numerical solve are capabilities supplied by the
//! caller.
//!
//! ## Quickstart
//!
//! ```no_run
//! use charuco_calib_pipeline::{
//!     BoardDetector, BoardSpec, CalibrationOrchestrator, CalibrationParams,
//!     CalibrationSolver, DetectionOrchestrator, ImageCollection, ImageStore,
//! };
//!
//! fn calibrate(
//!     store: impl ImageStore,
//!     detector: &impl BoardDetector,
//!     solver: &impl CalibrationSolver,
//! ) -> Result<(), Box<dyn std::error::Error>> {
//!     let board = BoardSpec::default();
//!     let mut images = ImageCollection::from_paths(["cam_000.png", "cam_001.png"]);
//!
//!     let report = DetectionOrchestrator::new(store).run_detection(&mut images, &board, detector)?;
//!     println!("{} of {} images usable", report.usable_count(), images.len());
//!
//!     let calib = CalibrationOrchestrator::new(CalibrationParams::default());
//!     let result = calib.run_calibration(&images, &board, solver)?;
//!     println!("rms {:.3}px", result.reprojection_error);
//!     Ok(())
//! }
//! ```

mod aggregate;
pub mod calibration;
mod cancel;
mod capability;
pub mod detection;
mod error;

pub use aggregate::{aggregate, AggregationResult, AggregationSummary};
pub use calibration::{
    CalibrationError, CalibrationOrchestrator, CalibrationParams, CalibrationResult,
    CalibrationStatus, ImagePose,
};
pub use cancel::CancelToken;
pub use capability::{
    BoardDetectError, BoardDetector, CalibrationSolver, Pose, SolverError, SolverOutput,
};
pub use detection::{
    DetectionError, DetectionOrchestrator, DetectionReport, DetectionStatus, ImageOutcome,
};
pub use error::ConfigurationError;

pub use charuco_calib_core::{
    BoardDetection, BoardSpec, CalibrationImage, DetectionRecord, DetectionResult, GrayImage,
    GrayImageView, ImageCollection, ImageLoadError, ImageSize, ImageStore, SelectError,
};
