//! Raster file adapters: decoding into [`PixelBuffer`](crate::image::PixelBuffer)s
//! and encoding them back out.

pub mod sink;
pub mod source;

pub use sink::{DEFAULT_COMPRESSION_LEVEL, save_image};
pub use source::load_image;
