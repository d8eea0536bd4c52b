pub mod image_set;

pub use image_set::*;
