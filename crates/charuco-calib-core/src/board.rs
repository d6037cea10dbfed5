//! Board specification and derived ChArUco geometry.

use crate::dictionary::ArucoDictionary;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Static ChArUco board specification.
///
/// `columns`/`rows` are **square counts** (not inner corner counts). Sizes
/// are in whatever physical unit the caller works in; the solver returns
/// translations in the same unit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardSpec {
    #[serde(default)]
    pub dictionary: ArucoDictionary,
    pub columns: u32,
    pub rows: u32,
    pub marker_size: f32,
    pub square_size: f32,
}

/// Board specification validation errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BoardSpecError {
    #[error("columns and rows must be >= 2 (got {columns}x{rows})")]
    InvalidSize { columns: u32, rows: u32 },
    #[error("square_size must be finite and > 0 (got {0})")]
    InvalidSquareSize(f32),
    #[error("marker_size must be finite and > 0 (got {0})")]
    InvalidMarkerSize(f32),
    #[error("marker_size {marker_size} must be smaller than square_size {square_size}")]
    MarkerNotSmallerThanSquare { marker_size: f32, square_size: f32 },
    #[error("board needs {needed} markers, {dictionary} has {available}")]
    NotEnoughDictionaryCodes {
        dictionary: ArucoDictionary,
        needed: usize,
        available: usize,
    },
}

impl Default for BoardSpec {
    /// 30x21 squares, 25 mm squares with 19 mm `DICT_4X4_1000` markers.
    fn default() -> Self {
        Self {
            dictionary: ArucoDictionary::Dict4x4_1000,
            columns: 30,
            rows: 21,
            marker_size: 0.019,
            square_size: 0.025,
        }
    }
}

impl BoardSpec {
    /// Build a spec and validate it in one step.
    pub fn new(
        dictionary: ArucoDictionary,
        columns: u32,
        rows: u32,
        marker_size: f32,
        square_size: f32,
    ) -> Result<Self, BoardSpecError> {
        let spec = Self {
            dictionary,
            columns,
            rows,
            marker_size,
            square_size,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Check every geometric and dictionary constraint of the board.
    pub fn validate(&self) -> Result<(), BoardSpecError> {
        if self.columns < 2 || self.rows < 2 {
            return Err(BoardSpecError::InvalidSize {
                columns: self.columns,
                rows: self.rows,
            });
        }
        if !self.square_size.is_finite() || self.square_size <= 0.0 {
            return Err(BoardSpecError::InvalidSquareSize(self.square_size));
        }
        if !self.marker_size.is_finite() || self.marker_size <= 0.0 {
            return Err(BoardSpecError::InvalidMarkerSize(self.marker_size));
        }
        if self.marker_size >= self.square_size {
            return Err(BoardSpecError::MarkerNotSmallerThanSquare {
                marker_size: self.marker_size,
                square_size: self.square_size,
            });
        }

        let needed = self.marker_count();
        let available = self.dictionary.capacity();
        if available < needed {
            return Err(BoardSpecError::NotEnoughDictionaryCodes {
                dictionary: self.dictionary,
                needed,
                available,
            });
        }
        Ok(())
    }

    /// Total number of chessboard squares.
    #[inline]
    pub fn square_count(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// Number of markers printed on the board.
    ///
    /// Markers sit on the white squares of an OpenCV layout (top-left square
    /// black), which is `floor(squares / 2)`.
    #[inline]
    pub fn marker_count(&self) -> usize {
        self.square_count() / 2
    }

    /// Inner chessboard corners along the horizontal direction.
    #[inline]
    pub fn inner_columns(&self) -> u32 {
        self.columns.saturating_sub(1)
    }

    /// Inner chessboard corners along the vertical direction.
    #[inline]
    pub fn inner_rows(&self) -> u32 {
        self.rows.saturating_sub(1)
    }

    /// Number of ChArUco corners; valid corner ids are `0..inner_corner_count()`.
    #[inline]
    pub fn inner_corner_count(&self) -> usize {
        self.inner_columns() as usize * self.inner_rows() as usize
    }

    /// Board-plane point (z = 0) for a ChArUco corner id.
    ///
    /// Origin is the outer top-left board corner; ids run row-major over
    /// the inner corners.
    pub fn corner_object_point(&self, id: u32) -> Option<Point3<f32>> {
        let cols = self.inner_columns();
        if cols == 0 || id as usize >= self.inner_corner_count() {
            return None;
        }
        let i = (id % cols) as f32 + 1.0;
        let j = (id / cols) as f32 + 1.0;
        Some(Point3::new(
            i * self.square_size,
            j * self.square_size,
            0.0,
        ))
    }

    /// Object points for a sequence of corner ids, `None` if any id is off the board.
    pub fn object_points(&self, ids: &[u32]) -> Option<Vec<Point3<f32>>> {
        ids.iter().map(|&id| self.corner_object_point(id)).collect()
    }
}
