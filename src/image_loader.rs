use std::io::Cursor;
use std::path::Path;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, ImageError, ImageFormat};

use crate::error::DecodeError;

/// Reads and decodes an image file. Animated GIFs yield their first frame.
pub fn open_image(path: &Path) -> Result<DynamicImage, DecodeError> {
    let bytes = std::fs::read(path).map_err(|source| DecodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let image_err = |source: ImageError| DecodeError::Image {
        path: path.to_path_buf(),
        source,
    };
    match image::guess_format(&bytes).map_err(image_err)? {
        ImageFormat::Gif => first_gif_frame(&bytes)
            .map_err(image_err)?
            .ok_or_else(|| DecodeError::NoFrames {
                path: path.to_path_buf(),
            }),
        format => image::load_from_memory_with_format(&bytes, format).map_err(image_err),
    }
}

/// `None` when the GIF holds no frames at all.
fn first_gif_frame(bytes: &[u8]) -> Result<Option<DynamicImage>, ImageError> {
    let mut frames = GifDecoder::new(Cursor::new(bytes))?.into_frames();
    let frame = frames.next().transpose()?;
    Ok(frame.map(|frame| DynamicImage::ImageRgba8(frame.into_buffer())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};
    use tempfile::tempdir;

    #[test]
    fn test_open_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("red.png");
        RgbImage::from_pixel(8, 4, Rgb([255, 0, 0])).save(&path).unwrap();

        let img = open_image(&path).unwrap();
        assert_eq!(img.dimensions(), (8, 4));
    }

    #[test]
    fn test_animated_gif_yields_first_frame() {
        use image::codecs::gif::GifEncoder;
        use image::{Frame, Rgba, RgbaImage};

        let dir = tempdir().unwrap();
        let path = dir.path().join("anim.gif");
        let mut encoder = GifEncoder::new(std::fs::File::create(&path).unwrap());
        encoder
            .encode_frames(vec![
                Frame::new(RgbaImage::from_pixel(6, 3, Rgba([255, 0, 0, 255]))),
                Frame::new(RgbaImage::from_pixel(6, 3, Rgba([0, 0, 255, 255]))),
            ])
            .unwrap();
        drop(encoder);

        let img = open_image(&path).unwrap();
        assert_eq!(img.dimensions(), (6, 3));
        let pixel = img.get_pixel(0, 0);
        assert!(pixel[0] > pixel[2]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = open_image(&dir.path().join("missing.png")).unwrap_err();
        assert!(matches!(err, DecodeError::Io { .. }));
    }

    #[test]
    fn test_corrupt_file_is_image_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not an image").unwrap();

        let err = open_image(&path).unwrap_err();
        assert!(matches!(err, DecodeError::Image { .. }));
        assert_eq!(err.path(), &path);
    }
}
