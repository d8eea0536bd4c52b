//! Look-ahead image cache for the slideshow.
//!
//! This module provides:
//! - `LookaheadCache` - Bounded window of decoded images around the current position
//! - `ImageDecoder` / `FileDecoder` - Decode + fit step used on misses and by the worker
//! - `SurfaceSize` - Display surface shared with the worker
//! - Window arithmetic and the background prefetch worker

pub mod cache;
pub mod decoder;
pub mod fit;
pub mod surface;
pub mod window;
mod worker;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::LookaheadCache;
pub use decoder::{FileDecoder, ImageDecoder};
pub use fit::DisplayImage;
pub use surface::SurfaceSize;
