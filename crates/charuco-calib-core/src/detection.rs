//! Per-image board detection evidence.

use crate::board::BoardSpec;
use crate::image::ImageSize;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Corners and markers found on one image.
///
/// `board_corners[k]` is the pixel position of ChArUco corner
/// `board_corner_ids[k]`; the same index alignment holds for markers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardDetection {
    pub board_corners: Vec<Point2<f32>>,
    pub board_corner_ids: Vec<u32>,
    /// Marker quads in TL, TR, BR, BL order.
    pub marker_corners: Vec<[Point2<f32>; 4]>,
    pub marker_ids: Vec<u32>,
}

/// Structural problem in a [`BoardDetection`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectionShapeError {
    #[error("{corners} corners but {ids} corner ids")]
    CornerIdMismatch { corners: usize, ids: usize },
    #[error("{quads} marker quads but {ids} marker ids")]
    MarkerIdMismatch { quads: usize, ids: usize },
    #[error("corner id {0} appears more than once")]
    DuplicateCornerId(u32),
    #[error("marker id {0} appears more than once")]
    DuplicateMarkerId(u32),
    #[error("corner id {id} is outside the board (max {max})")]
    CornerIdOutOfRange { id: u32, max: usize },
    #[error("marker id {id} is outside the board (max {max})")]
    MarkerIdOutOfRange { id: u32, max: usize },
    #[error("non-finite corner coordinate at index {0}")]
    NonFiniteCorner(usize),
}

impl BoardDetection {
    /// Number of ChArUco corners.
    #[inline]
    pub fn corner_count(&self) -> usize {
        self.board_corners.len()
    }

    /// Number of decoded markers.
    #[inline]
    pub fn marker_count(&self) -> usize {
        self.marker_ids.len()
    }

    /// `true` if the detection carries no usable corner correspondences.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.board_corners.is_empty() || self.board_corner_ids.is_empty()
    }

    /// Check index alignment and id uniqueness without reference to a board.
    pub fn check_shape(&self) -> Result<(), DetectionShapeError> {
        if self.board_corners.len() != self.board_corner_ids.len() {
            return Err(DetectionShapeError::CornerIdMismatch {
                corners: self.board_corners.len(),
                ids: self.board_corner_ids.len(),
            });
        }
        if self.marker_corners.len() != self.marker_ids.len() {
            return Err(DetectionShapeError::MarkerIdMismatch {
                quads: self.marker_corners.len(),
                ids: self.marker_ids.len(),
            });
        }
        if let Some(idx) = self
            .board_corners
            .iter()
            .position(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(DetectionShapeError::NonFiniteCorner(idx));
        }
        if let Some(id) = first_duplicate(&self.board_corner_ids) {
            return Err(DetectionShapeError::DuplicateCornerId(id));
        }
        if let Some(id) = first_duplicate(&self.marker_ids) {
            return Err(DetectionShapeError::DuplicateMarkerId(id));
        }
        Ok(())
    }

    /// Full validation: shape plus id ranges of `board`.
    pub fn validate(&self, board: &BoardSpec) -> Result<(), DetectionShapeError> {
        self.check_shape()?;

        let max_corner = board.inner_corner_count();
        if let Some(&id) = self
            .board_corner_ids
            .iter()
            .find(|&&id| id as usize >= max_corner)
        {
            return Err(DetectionShapeError::CornerIdOutOfRange {
                id,
                max: max_corner,
            });
        }
        let max_marker = board.marker_count();
        if let Some(&id) = self
            .marker_ids
            .iter()
            .find(|&&id| id as usize >= max_marker)
        {
            return Err(DetectionShapeError::MarkerIdOutOfRange {
                id,
                max: max_marker,
            });
        }
        Ok(())
    }
}

fn first_duplicate(ids: &[u32]) -> Option<u32> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().find(|&id| !seen.insert(id))
}

/// Outcome of running a board detector on one image.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DetectionResult {
    /// Board absent, or the detector found nothing usable.
    #[default]
    NotDetected,
    Detected(BoardDetection),
}

impl DetectionResult {
    #[inline]
    pub fn is_detected(&self) -> bool {
        matches!(self, Self::Detected(_))
    }

    /// Detection with at least one corner/id pair.
    pub fn usable(&self) -> Option<&BoardDetection> {
        match self {
            Self::Detected(det) if !det.is_degenerate() => Some(det),
            _ => None,
        }
    }

    pub fn as_detection(&self) -> Option<&BoardDetection> {
        match self {
            Self::Detected(det) => Some(det),
            Self::NotDetected => None,
        }
    }
}

/// A detection result together with the context it was produced in.
///
/// The board is kept so results produced under an older board geometry can
/// be recognised as stale; the image size lets calibration check that all
/// contributing images agree without touching pixel data again.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub board: BoardSpec,
    pub image_size: ImageSize,
    pub result: DetectionResult,
}

impl DetectionRecord {
    pub fn new(board: BoardSpec, image_size: ImageSize, result: DetectionResult) -> Self {
        Self {
            board,
            image_size,
            result,
        }
    }

    /// `true` if this record was produced under `board`.
    #[inline]
    pub fn matches_board(&self, board: &BoardSpec) -> bool {
        self.board == *board
    }
}
