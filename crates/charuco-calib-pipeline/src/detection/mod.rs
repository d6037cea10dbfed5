//! Detection pass over an image collection.
//!
//! Runs a [`BoardDetector`](crate::BoardDetector) on every image in
//! collection order, stores the outcome on the image and reports what
//! happened to each one.

mod error;
mod orchestrator;
mod report;

pub use error::DetectionError;
pub use orchestrator::DetectionOrchestrator;
pub use report::{DetectionReport, DetectionStatus, ImageOutcome};
