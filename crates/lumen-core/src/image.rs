//! Pixel buffers handed from stage to stage in the enhancement pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::BufferSizeError;

/// Sample types a [`PixelBuffer`] can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleType {
    /// 8-bit unsigned integer, `[0, 255]`.
    U8,
    /// 32-bit float normalized to `[0.0, 1.0]`.
    F32,
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U8 => write!(f, "8-bit"),
            Self::F32 => write!(f, "32-bit float"),
        }
    }
}

/// Channel layout of interleaved samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelOrder {
    /// Single gray channel.
    Luma,
    /// Red, green, blue.
    Rgb,
    /// Red, green, blue, straight alpha.
    Rgba,
}

impl ChannelOrder {
    /// Number of interleaved samples per pixel.
    pub const fn count(self) -> usize {
        match self {
            Self::Luma => 1,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
}

impl fmt::Display for ChannelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Luma => write!(f, "luma"),
            Self::Rgb => write!(f, "RGB"),
            Self::Rgba => write!(f, "RGBA"),
        }
    }
}

/// A sample type with a declared valid intensity range.
pub trait Sample: Copy + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Runtime tag for this sample type.
    const TYPE: SampleType;
    /// Lowest valid intensity.
    const LOWEST: f32;
    /// Highest valid intensity.
    const HIGHEST: f32;

    /// Widen to `f32` in this type's own scale.
    fn to_f32(self) -> f32;

    /// Narrow an `f32` in this type's own scale, clamping to `[LOWEST, HIGHEST]`.
    ///
    /// Integer types truncate toward zero. NaN maps to `LOWEST`.
    fn from_f32_clamped(value: f32) -> Self;
}

impl Sample for u8 {
    const TYPE: SampleType = SampleType::U8;
    const LOWEST: f32 = 0.0;
    const HIGHEST: f32 = 255.0;

    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }

    #[inline]
    fn from_f32_clamped(value: f32) -> Self {
        // `as` saturates and sends NaN to 0.
        value.clamp(Self::LOWEST, Self::HIGHEST) as u8
    }
}

impl Sample for f32 {
    const TYPE: SampleType = SampleType::F32;
    const LOWEST: f32 = 0.0;
    const HIGHEST: f32 = 1.0;

    #[inline]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline]
    fn from_f32_clamped(value: f32) -> Self {
        if value.is_nan() {
            Self::LOWEST
        } else {
            value.clamp(Self::LOWEST, Self::HIGHEST)
        }
    }
}

/// A rectangular grid of interleaved samples.
///
/// Buffers are moved through the pipeline: every stage consumes one buffer
/// and returns a new one with the same dimensions and channel order.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer<T> {
    width: u32,
    height: u32,
    channels: ChannelOrder,
    samples: Vec<T>,
}

impl<T: Sample> PixelBuffer<T> {
    /// Wrap interleaved samples. Fails when the sample count does not match
    /// `width * height * channels`.
    pub fn from_raw(
        width: u32,
        height: u32,
        channels: ChannelOrder,
        samples: Vec<T>,
    ) -> Result<Self, BufferSizeError> {
        let expected = width as usize * height as usize * channels.count();
        if samples.len() != expected {
            return Err(BufferSizeError {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            samples,
        })
    }

    /// A buffer with every sample set to `value`.
    pub fn filled(width: u32, height: u32, channels: ChannelOrder, value: T) -> Self {
        let len = width as usize * height as usize * channels.count();
        Self {
            width,
            height,
            channels,
            samples: vec![value; len],
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Channel layout.
    pub fn channels(&self) -> ChannelOrder {
        self.channels
    }

    /// Declared sample type.
    pub fn sample_type(&self) -> SampleType {
        T::TYPE
    }

    /// Number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Interleaved samples.
    pub fn samples(&self) -> &[T] {
        &self.samples
    }

    /// Mutable interleaved samples.
    pub fn samples_mut(&mut self) -> &mut [T] {
        &mut self.samples
    }

    pub fn into_samples(self) -> Vec<T> {
        self.samples
    }

    /// Iterate pixels as channel slices.
    pub fn pixels(&self) -> std::slice::ChunksExact<'_, T> {
        self.samples.chunks_exact(self.channels.count())
    }

    /// Sample at `(x, y, channel)`. Panics when out of bounds.
    pub fn get(&self, x: u32, y: u32, channel: usize) -> T {
        let idx = (y as usize * self.width as usize + x as usize) * self.channels.count() + channel;
        self.samples[idx]
    }

    /// Build a new buffer of the same shape by mapping every sample.
    pub fn map_samples<U: Sample>(&self, f: impl Fn(T) -> U) -> PixelBuffer<U> {
        PixelBuffer {
            width: self.width,
            height: self.height,
            channels: self.channels,
            samples: self.samples.iter().map(|&s| f(s)).collect(),
        }
    }
}

impl PixelBuffer<u8> {
    /// Normalize to `[0, 1]` floats (`sample / 255`).
    pub fn to_f32(&self) -> PixelBuffer<f32> {
        self.map_samples(|s| s as f32 / u8::MAX as f32)
    }
}

impl PixelBuffer<f32> {
    /// Scale back to 8-bit (`sample * 255`, clamped, truncated).
    pub fn to_u8(&self) -> PixelBuffer<u8> {
        self.map_samples(|s| u8::from_f32_clamped(s * u8::MAX as f32))
    }
}
