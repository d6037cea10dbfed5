//! High-level facade for the `charuco-calib-*` workspace.
//!
//! This crate provides:
//! - re-exports of the data model ([`core`]) and the orchestration layer
//!   ([`pipeline`]);
//! - JSON session configs and reports ([`io`]) plus [`run_session`], which
//!   drives a full detection and calibration pass;
//! - (feature `image`) [`FsImageStore`], loading grayscale pixels from disk
//!   with the `image` crate.
//!
//! ## Quickstart
//!
//! ```no_run
//! use charuco_calib::{io::SessionConfig, run_session, FsImageStore};
//! use charuco_calib::pipeline::{BoardDetector, CalibrationSolver};
//!
//! fn calibrate_from_config(
//!     detector: &impl BoardDetector,
//!     solver: &impl CalibrationSolver,
//! ) -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = SessionConfig::load_json("session.json")?;
//!     let report = run_session(&cfg, FsImageStore, detector, solver)?;
//!     report.write_json(cfg.output_path())?;
//!     Ok(())
//! }
//! ```
//!
//! ## API map
//! - `charuco_calib::core`: board, dictionaries, images, detection records.
//! - `charuco_calib::pipeline`: detection pass, aggregation, calibration.
//! - `charuco_calib::io`: JSON session config and report.

pub use charuco_calib_core as core;
pub use charuco_calib_pipeline as pipeline;

pub use charuco_calib_core::{ArucoDictionary, BoardSpec, ImageCollection};
pub use charuco_calib_pipeline::{
    CalibrationOrchestrator, CalibrationParams, CalibrationResult, DetectionOrchestrator,
};

pub mod io;
mod session;

#[cfg(feature = "image")]
mod store;

pub use session::{run_session, SessionError};

#[cfg(feature = "image")]
pub use store::FsImageStore;
