use crate::error::ConfigurationError;

/// Errors that abort a whole detection pass.
///
/// Per-image problems (unreadable files, detector failures) are never
/// reported here; they end up in the [`DetectionReport`](super::DetectionReport).
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigurationError),
}
