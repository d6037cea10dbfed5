//! JSON session configuration and report.

use charuco_calib_core::{BoardSpec, BoardSpecError, ImageCollection};
use charuco_calib_pipeline::{
    AggregationSummary, CalibrationParams, CalibrationResult, DetectionReport,
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum SessionIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SessionConfigError {
    #[error(transparent)]
    Board(#[from] BoardSpecError),
    #[error("session config lists no images")]
    NoImages,
}

/// Input of one calibration session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub images: Vec<PathBuf>,
    #[serde(default)]
    pub board: BoardSpec,
    #[serde(default)]
    pub calibration: CalibrationParams,
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

impl SessionConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SessionIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), SessionIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the output report path.
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("charuco_calib_report.json"))
    }

    /// Validated board of this session.
    pub fn build_board(&self) -> Result<BoardSpec, SessionConfigError> {
        self.board.validate()?;
        Ok(self.board)
    }

    /// Image collection in config order.
    pub fn build_collection(&self) -> Result<ImageCollection, SessionConfigError> {
        if self.images.is_empty() {
            return Err(SessionConfigError::NoImages);
        }
        Ok(self.images.iter().cloned().collect())
    }
}

/// Everything one session produced. Fields stay `None` for stages that did
/// not run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub board: BoardSpec,
    #[serde(default)]
    pub detection: Option<DetectionReport>,
    #[serde(default)]
    pub aggregation: Option<AggregationSummary>,
    #[serde(default)]
    pub calibration: Option<CalibrationResult>,
    #[serde(default)]
    pub error: Option<String>,
}

impl SessionReport {
    pub fn new(board: BoardSpec) -> Self {
        Self {
            board,
            detection: None,
            aggregation: None,
            calibration: None,
            error: None,
        }
    }

    /// Record the error that stopped the session.
    pub fn set_error(&mut self, err: impl std::fmt::Display) {
        self.error = Some(err.to_string());
    }

    /// Load a report from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SessionIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), SessionIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
