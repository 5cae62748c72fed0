//! Image loading and format conversion.

use std::path::Path;

use image::{DynamicImage, GrayImage, ImageError, RgbImage, RgbaImage};

use crate::error::{BufferSizeError, DecodeError};
use crate::image::{ChannelOrder, PixelBuffer};

/// Load an image from disk as 8-bit RGB.
///
/// Supports every format the `image` crate decodes. Gray, alpha and
/// high-bit-depth sources are all flattened to 8-bit RGB, like a default
/// three-channel color read.
pub fn load_image(path: &Path) -> Result<PixelBuffer<u8>, DecodeError> {
    let img = image::open(path).map_err(|e| match e {
        ImageError::IoError(source) => DecodeError::Io {
            path: path.to_path_buf(),
            source,
        },
        source => DecodeError::Image {
            path: path.to_path_buf(),
            source,
        },
    })?;
    Ok(from_dynamic(&img)?)
}

/// Convert a decoded image to an 8-bit RGB buffer.
pub fn from_dynamic(img: &DynamicImage) -> Result<PixelBuffer<u8>, BufferSizeError> {
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    PixelBuffer::from_raw(width, height, ChannelOrder::Rgb, rgb.into_raw())
}

/// Wrap an 8-bit buffer as a `DynamicImage` for encoding.
pub fn to_dynamic(buffer: &PixelBuffer<u8>) -> Option<DynamicImage> {
    let (width, height) = buffer.dimensions();
    let raw = buffer.samples().to_vec();
    match buffer.channels() {
        ChannelOrder::Luma => GrayImage::from_raw(width, height, raw).map(DynamicImage::ImageLuma8),
        ChannelOrder::Rgb => RgbImage::from_raw(width, height, raw).map(DynamicImage::ImageRgb8),
        ChannelOrder::Rgba => RgbaImage::from_raw(width, height, raw).map(DynamicImage::ImageRgba8),
    }
}
