//! Exposure gain.

use crate::image::{ChannelOrder, PixelBuffer, Sample};

/// Multiply every color sample by `exposure` and clamp to the sample type's
/// valid range.
///
/// ```text
/// out = clamp(in × exposure, T::LOWEST, T::HIGHEST)
/// ```
///
/// 8-bit results are truncated toward zero. Alpha in RGBA buffers is not an
/// intensity and is left alone. `exposure = 1.0` returns the buffer as-is;
/// anything else compounds when applied repeatedly.
pub fn apply_exposure<T: Sample>(mut buffer: PixelBuffer<T>, exposure: f32) -> PixelBuffer<T> {
    if (exposure - 1.0).abs() < 1e-7 {
        return buffer;
    }

    let stride = buffer.channels().count();
    let color_channels = match buffer.channels() {
        ChannelOrder::Rgba => 3,
        other => other.count(),
    };

    for px in buffer.samples_mut().chunks_exact_mut(stride) {
        for sample in &mut px[..color_channels] {
            *sample = T::from_f32_clamped(sample.to_f32() * exposure);
        }
    }
    buffer
}
