use charuco_calib_core::BoardSpecError;

/// Bad inputs to a pass; fatal to the call and not worth retrying unchanged.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error(transparent)]
    Board(#[from] BoardSpecError),
    #[error("image collection is empty")]
    EmptyCollection,
}
