use charuco_calib_core::{GrayImage, ImageLoadError, ImageStore};
use image::ImageReader;
use std::path::Path;

/// Loads images from the filesystem and converts them to 8-bit luma.
///
/// Any format the `image` crate can decode is accepted; the format is guessed
/// from the file contents.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsImageStore;

impl ImageStore for FsImageStore {
    fn load_grayscale(&self, path: &Path) -> Result<GrayImage, ImageLoadError> {
        let luma = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| ImageLoadError::new(path, e))?
            .decode()
            .map_err(|e| ImageLoadError::new(path, e))?
            .to_luma8();
        let (width, height) = luma.dimensions();
        GrayImage::new(width as usize, height as usize, luma.into_raw())
            .map_err(|e| ImageLoadError::new(path, e))
    }
}
