//! Fitting decoded images to the display surface.
//!
//! Images are scaled (up or down) to fill the surface minus a fixed margin
//! while preserving aspect ratio, then stored as RGBA8.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use tracing::trace;

use crate::config::DEFAULT_SURFACE;

/// Space left free between the image and the surface edges, in pixels.
pub const SURFACE_MARGIN: u32 = 40;

/// Bytes per pixel of [`DisplayImage::pixels`].
const BYTES_PER_PIXEL: usize = 4;

/// A decoded image resized for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayImage {
    /// RGBA8 pixel data, row-major.
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Dimensions of the source before resizing.
    pub source_width: u32,
    pub source_height: u32,
}

impl DisplayImage {
    pub fn memory_bytes(&self) -> usize {
        self.pixels.len()
    }
}

/// Target box for a surface: the surface minus the margin on each axis.
///
/// Surfaces that have not been laid out yet (either side `<= 1`) fall back to
/// the default surface.
pub fn target_bounds(surface: (u32, u32)) -> (u32, u32) {
    let (w, h) = if surface.0 <= 1 || surface.1 <= 1 {
        DEFAULT_SURFACE
    } else {
        surface
    };
    (
        w.saturating_sub(SURFACE_MARGIN).max(1),
        h.saturating_sub(SURFACE_MARGIN).max(1),
    )
}

/// Largest size with the source aspect ratio that fits inside `surface` minus the margin.
pub fn fit_dimensions(src_width: u32, src_height: u32, surface: (u32, u32)) -> (u32, u32) {
    let (target_w, target_h) = target_bounds(surface);
    if src_width == 0 || src_height == 0 {
        return (target_w, target_h);
    }

    let img_ratio = src_width as f64 / src_height as f64;
    let target_ratio = target_w as f64 / target_h as f64;

    let (w, h) = if img_ratio > target_ratio {
        (target_w, (target_w as f64 / img_ratio) as u32)
    } else {
        ((target_h as f64 * img_ratio) as u32, target_h)
    };

    (w.clamp(1, target_w), h.clamp(1, target_h))
}

/// Resizes `img` to fit `surface` and converts it to RGBA8.
pub fn fit_to_surface(img: &DynamicImage, surface: (u32, u32)) -> DisplayImage {
    let (source_width, source_height) = img.dimensions();
    let (width, height) = fit_dimensions(source_width, source_height, surface);

    trace!(
        source_width,
        source_height,
        width,
        height,
        "Fitting image to surface"
    );

    let resized = if (width, height) == (source_width, source_height) {
        img.to_rgba8()
    } else {
        img.resize_exact(width, height, FilterType::Lanczos3).to_rgba8()
    };

    debug_assert_eq!(
        resized.as_raw().len(),
        width as usize * height as usize * BYTES_PER_PIXEL
    );

    DisplayImage {
        pixels: resized.into_raw(),
        width,
        height,
        source_width,
        source_height,
    }
}
