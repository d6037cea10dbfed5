use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Pixel dimensions of an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

impl GrayImageView<'_> {
    #[inline]
    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width as u32, self.height as u32)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }
}

/// Owned 8-bit grayscale buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

/// Raw buffer does not match the declared dimensions.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("grayscale buffer has {got} bytes, {width}x{height} needs {expected}")]
pub struct GrayBufferError {
    pub width: usize,
    pub height: usize,
    pub expected: usize,
    pub got: usize,
}

impl GrayImage {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self, GrayBufferError> {
        let expected = width.checked_mul(height).unwrap_or(usize::MAX);
        if data.len() != expected {
            return Err(GrayBufferError {
                width,
                height,
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Uniformly filled image.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        let len = width
            .checked_mul(height)
            .unwrap_or_else(|| panic!("{width}x{height} image does not fit in memory"));
        Self {
            width,
            height,
            data: vec![value; len],
        }
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width as u32, self.height as u32)
    }
}

/// Failure to read pixels for one image.
#[derive(thiserror::Error, Debug)]
#[error("failed to load image {}: {source}", .path.display())]
pub struct ImageLoadError {
    pub path: PathBuf,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl ImageLoadError {
    pub fn new(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Source of grayscale pixel data keyed by file path.
///
/// Failures are per path; callers decide whether one bad file aborts
/// anything (the detection loop never does).
pub trait ImageStore {
    fn load_grayscale(&self, path: &Path) -> Result<GrayImage, ImageLoadError>;
}

impl<T: ImageStore + ?Sized> ImageStore for &T {
    fn load_grayscale(&self, path: &Path) -> Result<GrayImage, ImageLoadError> {
        (**self).load_grayscale(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_checks_buffer_length() {
        let err = GrayImage::new(4, 3, vec![0; 11]).unwrap_err();
        assert_eq!(err.expected, 12);
        assert_eq!(err.got, 11);
        let img = GrayImage::new(4, 3, vec![7; 12]).expect("image");
        assert_eq!(img.size(), ImageSize::new(4, 3));
    }

    #[test]
    #[should_panic(expected = "does not fit in memory")]
    fn filled_rejects_overflowing_dimensions() {
        let _ = GrayImage::filled(usize::MAX, 2, 0);
    }

    #[test]
    fn view_indexing_is_row_major() {
        let img = GrayImage::new(3, 2, vec![0, 1, 2, 3, 4, 5]).expect("image");
        let view = img.view();
        assert_eq!(view.get(2, 0), Some(2));
        assert_eq!(view.get(0, 1), Some(3));
        assert_eq!(view.get(3, 0), None);
        assert_eq!(view.size(), img.size());
    }

    #[test]
    fn load_error_names_the_path() {
        let err = ImageLoadError::new("shots/img_003.png", "truncated file");
        let msg = err.to_string();
        assert!(msg.contains("img_003.png"), "{msg}");
        assert!(msg.contains("truncated file"), "{msg}");
    }
}
