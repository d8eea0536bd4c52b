//! Deterministic decoder and helpers for cache and session tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::decoder::ImageDecoder;
use super::fit::{fit_dimensions, DisplayImage};
use crate::config::parse_surface;
use crate::error::DecodeError;

/// Decoder that fabricates images from the file name and counts calls.
///
/// Stems starting with `bad` fail; a `_WxH` suffix sets the source size.
pub struct StubDecoder {
    calls: AtomicUsize,
    delay: Duration,
}

impl StubDecoder {
    pub fn new() -> Arc<Self> {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageDecoder for StubDecoder {
    fn decode(&self, path: &Path, surface: (u32, u32)) -> Result<DisplayImage, DecodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        if name.starts_with("bad") {
            return Err(DecodeError::NoFrames {
                path: path.to_path_buf(),
            });
        }
        let (sw, sh) = name
            .split_once('_')
            .and_then(|(_, dims)| parse_surface(dims))
            .unwrap_or((400, 300));
        let (width, height) = fit_dimensions(sw, sh, surface);
        Ok(DisplayImage {
            pixels: vec![0; width as usize * height as usize * 4],
            width,
            height,
            source_width: sw,
            source_height: sh,
        })
    }
}

/// `n` decodable 400x300 paths in sorted order.
pub fn paths(n: usize) -> Vec<PathBuf> {
    (0..n)
        .map(|i| PathBuf::from(format!("/img/{:03}_400x300.png", i)))
        .collect()
}

/// Polls `condition` for up to five seconds.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
