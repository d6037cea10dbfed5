//! Ordered calibration image set and per-image state.

use crate::board::BoardSpec;
use crate::detection::DetectionRecord;
use crate::image::{GrayImage, ImageLoadError, ImageStore};
use std::path::{Path, PathBuf};

/// One image of the calibration set.
///
/// The pixel buffer is optional and only kept while somebody needs it (for
/// example the viewer's current selection); detection passes load their own
/// scoped copy otherwise.
#[derive(Clone, Debug)]
pub struct CalibrationImage {
    path: PathBuf,
    buffer: Option<GrayImage>,
    detection: Option<DetectionRecord>,
}

impl CalibrationImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            buffer: None,
            detection: None,
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Currently resident pixel buffer, if any.
    #[inline]
    pub fn buffer(&self) -> Option<&GrayImage> {
        self.buffer.as_ref()
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.buffer.is_some()
    }

    /// Load the buffer through `store` unless it is already resident.
    pub fn load<S: ImageStore + ?Sized>(
        &mut self,
        store: &S,
    ) -> Result<&GrayImage, ImageLoadError> {
        let buffer = match self.buffer.take() {
            Some(buffer) => buffer,
            None => store.load_grayscale(&self.path)?,
        };
        Ok(&*self.buffer.insert(buffer))
    }

    /// Drop the resident buffer.
    pub fn release_buffer(&mut self) {
        self.buffer = None;
    }

    #[inline]
    pub fn detection(&self) -> Option<&DetectionRecord> {
        self.detection.as_ref()
    }

    /// Replace the stored detection record as a whole.
    pub fn set_detection(&mut self, record: DetectionRecord) {
        self.detection = Some(record);
    }

    pub fn clear_detection(&mut self) {
        self.detection = None;
    }
}

/// Failure of [`ImageCollection::select`].
#[derive(thiserror::Error, Debug)]
pub enum SelectError {
    #[error("no image at index {index} (collection has {len})")]
    OutOfRange { index: usize, len: usize },
    #[error(transparent)]
    Load(#[from] ImageLoadError),
}

/// Ordered set of calibration images.
///
/// Positions in the collection are the index space for everything computed
/// per image downstream (aggregation, per-view poses). Duplicate paths are
/// allowed and produce independent entries.
#[derive(Clone, Debug, Default)]
pub struct ImageCollection {
    images: Vec<CalibrationImage>,
    selected: Option<usize>,
}

impl ImageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            images: paths.into_iter().map(CalibrationImage::new).collect(),
            selected: None,
        }
    }

    /// Append an image and return its index.
    pub fn push(&mut self, path: impl Into<PathBuf>) -> usize {
        self.images.push(CalibrationImage::new(path));
        self.images.len() - 1
    }

    /// Remove the image at `index`, keeping the selection pointed at the same image.
    pub fn remove(&mut self, index: usize) -> Option<CalibrationImage> {
        if index >= self.images.len() {
            return None;
        }
        self.selected = match self.selected {
            Some(s) if s == index => None,
            Some(s) if s > index => Some(s - 1),
            other => other,
        };
        Some(self.images.remove(index))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&CalibrationImage> {
        self.images.get(index)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut CalibrationImage> {
        self.images.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CalibrationImage> {
        self.images.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CalibrationImage> {
        self.images.iter_mut()
    }

    /// Index of the image the viewer currently shows.
    #[inline]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Make `index` the viewer selection and load its pixels.
    ///
    /// The previously selected image's buffer is released. An out-of-range
    /// index leaves the current selection untouched; on a load error the
    /// selection is cleared.
    pub fn select<S: ImageStore + ?Sized>(
        &mut self,
        index: usize,
        store: &S,
    ) -> Result<&GrayImage, SelectError> {
        if index >= self.images.len() {
            return Err(SelectError::OutOfRange {
                index,
                len: self.images.len(),
            });
        }
        if let Some(prev) = self.selected.take() {
            if prev != index {
                if let Some(img) = self.images.get_mut(prev) {
                    img.release_buffer();
                }
            }
        }
        let buffer = self.images[index].load(store)?;
        self.selected = Some(index);
        Ok(buffer)
    }

    /// Clear the viewer selection and release its buffer.
    pub fn clear_selection(&mut self) {
        if let Some(prev) = self.selected.take() {
            if let Some(img) = self.images.get_mut(prev) {
                img.release_buffer();
            }
        }
    }

    /// Drop every detection record produced under a board other than `board`.
    ///
    /// Returns the number of records dropped.
    pub fn invalidate_stale(&mut self, board: &BoardSpec) -> usize {
        let mut dropped = 0;
        for image in &mut self.images {
            if image
                .detection
                .as_ref()
                .is_some_and(|rec| !rec.matches_board(board))
            {
                image.detection = None;
                dropped += 1;
            }
        }
        dropped
    }

    /// Owned copy of every image's detection record, in collection order.
    pub fn detection_snapshot(&self) -> Vec<Option<DetectionRecord>> {
        self.images.iter().map(|img| img.detection.clone()).collect()
    }
}

impl<'a> IntoIterator for &'a ImageCollection {
    type Item = &'a CalibrationImage;
    type IntoIter = std::slice::Iter<'a, CalibrationImage>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.iter()
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for ImageCollection {
    fn from_iter<T: IntoIterator<Item = P>>(iter: T) -> Self {
        Self::from_paths(iter)
    }
}
