//! Display surface size shared between the display path and the prefetch worker.

use std::sync::Arc;

use parking_lot::RwLock;

/// Current display surface (width, height).
///
/// Written by whoever owns the viewport, read by decode workers on every decode.
/// Changing it does not touch images that are already cached.
#[derive(Debug, Clone)]
pub struct SurfaceSize {
    size: Arc<RwLock<(u32, u32)>>,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Arc::new(RwLock::new((width, height))),
        }
    }

    pub fn get(&self) -> (u32, u32) {
        *self.size.read()
    }

    pub fn set(&self, width: u32, height: u32) {
        *self.size.write() = (width, height);
    }
}

impl Default for SurfaceSize {
    fn default() -> Self {
        let (w, h) = crate::config::DEFAULT_SURFACE;
        Self::new(w, h)
    }
}
