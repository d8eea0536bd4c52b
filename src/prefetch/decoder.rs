//! The decode-and-fit step shared by cache misses and the prefetch worker.

use std::path::Path;

use tracing::debug;

use super::fit::{fit_to_surface, DisplayImage};
use crate::error::DecodeError;
use crate::image_loader;

/// Turns a source path into an image sized for `surface`.
///
/// Implementations must be callable from the display thread and the prefetch
/// worker at the same time.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, path: &Path, surface: (u32, u32)) -> Result<DisplayImage, DecodeError>;
}

/// Decodes image files from disk with the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileDecoder;

impl ImageDecoder for FileDecoder {
    fn decode(&self, path: &Path, surface: (u32, u32)) -> Result<DisplayImage, DecodeError> {
        let img = image_loader::open_image(path)?;
        let fitted = fit_to_surface(&img, surface);
        debug!(
            ?path,
            source_width = fitted.source_width,
            source_height = fitted.source_height,
            width = fitted.width,
            height = fitted.height,
            "Decoded image"
        );
        Ok(fitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    #[test]
    fn test_file_decoder_fits_surface() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wide.png");
        RgbImage::from_pixel(400, 100, Rgb([0, 128, 255])).save(&path).unwrap();

        let fitted = FileDecoder.decode(&path, (240, 240)).unwrap();
        assert_eq!((fitted.width, fitted.height), (200, 50));
        assert_eq!((fitted.source_width, fitted.source_height), (400, 100));
    }

    #[test]
    fn test_file_decoder_reports_bad_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.png");
        std::fs::write(&path, [0u8; 16]).unwrap();

        assert!(FileDecoder.decode(&path, (800, 600)).is_err());
    }
}
