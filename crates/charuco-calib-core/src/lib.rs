//! Core data model for multi-image ChArUco camera calibration.
//!
//! This crate holds the board description, the per-image detection evidence
//! and the ordered image collection the calibration pipeline works on. It is
//! purely a data crate: it does not detect corners and does not solve
//! anything.

mod board;
mod collection;
mod detection;
mod dictionary;
mod image;
mod logger;

pub use board::{BoardSpec, BoardSpecError};
pub use collection::{CalibrationImage, ImageCollection, SelectError};
pub use detection::{BoardDetection, DetectionRecord, DetectionResult, DetectionShapeError};
pub use dictionary::{ArucoDictionary, UnknownDictionary};
pub use image::{
    GrayBufferError, GrayImage, GrayImageView, ImageLoadError, ImageSize, ImageStore,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_level, LOG_ENV_VAR};
