//! Reinhard & Devlin photoreceptor operator.
//!
//! # Reference
//! Reinhard, E. and Devlin, K., "Dynamic Range Reduction Inspired by
//! Photoreceptor Physiology" (2005)
//!
//! ```text
//! key    = 0.3 + 0.7 × ((log_max − log_mean) / (log_max − log_min))^1.4
//! adapt  = lerp(lerp(gray, c, color_adapt), global, 1 − light_adapt)
//! out_c  = c / (c + (e^−intensity × adapt)^key)
//! ```
//!
//! followed by a min/max stretch and gamma correction.

use crate::error::ToneMapError;
use crate::image::PixelBuffer;
use crate::tonemap::ToneMapOperator;
use crate::tonemap::common::{finish, gray, rgb_pixels, safe_ln};

/// Global Reinhard operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reinhard {
    /// Gamma of the final correction curve.
    pub gamma: f32,
    /// Overall intensity bias, roughly `[-8, 8]`. Higher is brighter.
    pub intensity: f32,
    /// 1.0 adapts to each pixel, 0.0 to the global average.
    pub light_adapt: f32,
    /// 1.0 adapts channels independently, 0.0 to gray.
    pub color_adapt: f32,
}

impl Default for Reinhard {
    fn default() -> Self {
        Self {
            gamma: 1.5,
            intensity: 0.0,
            light_adapt: 1.0,
            color_adapt: 0.0,
        }
    }
}

impl ToneMapOperator for Reinhard {
    fn name(&self) -> &'static str {
        "Reinhard"
    }

    fn process(&self, image: &PixelBuffer<f32>) -> Result<PixelBuffer<f32>, ToneMapError> {
        let mut pixels = rgb_pixels(image)?;
        let count = pixels.len() as f64;

        let grays: Vec<f32> = pixels.iter().map(|&px| gray(px)).collect();

        let mut log_sum = 0.0_f64;
        let mut log_min = f32::INFINITY;
        let mut log_max = f32::NEG_INFINITY;
        for &g in &grays {
            let l = safe_ln(g);
            log_sum += l as f64;
            log_min = log_min.min(l);
            log_max = log_max.max(l);
        }
        let log_mean = (log_sum / count) as f32;

        let log_range = log_max - log_min;
        if log_range <= f32::EPSILON {
            return Err(ToneMapError::DegenerateRange);
        }
        let key = 0.3 + 0.7 * ((log_max - log_mean) / log_range).powf(1.4);
        let intensity = (-self.intensity).exp();

        let mut chan_mean = [0.0_f64; 3];
        for px in &pixels {
            for c in 0..3 {
                chan_mean[c] += px[c] as f64;
            }
        }
        let chan_mean = chan_mean.map(|s| (s / count) as f32);
        let gray_mean = (grays.iter().map(|&g| g as f64).sum::<f64>() / count) as f32;

        for (px, &g) in pixels.iter_mut().zip(&grays) {
            for c in 0..3 {
                let global = self.color_adapt * chan_mean[c] + (1.0 - self.color_adapt) * gray_mean;
                let local = self.color_adapt * px[c] + (1.0 - self.color_adapt) * g;
                let adapt = self.light_adapt * local + (1.0 - self.light_adapt) * global;
                let adapt = (intensity * adapt).max(0.0).powf(key);

                let denom = px[c] + adapt;
                px[c] = if denom > 0.0 { px[c] / denom } else { 0.0 };
            }
        }

        finish(image, pixels, self.gamma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ChannelOrder;

    fn gradient(width: u32, height: u32) -> PixelBuffer<f32> {
        let mut samples = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let v = (x + y * width) as f32 / (width * height - 1) as f32;
                samples.extend_from_slice(&[v, v * 0.8, v * 0.5]);
            }
        }
        PixelBuffer::from_raw(width, height, ChannelOrder::Rgb, samples).unwrap()
    }

    #[test]
    fn test_reinhard_output_in_unit_range() {
        let out = Reinhard::default().process(&gradient(8, 8)).unwrap();
        assert_eq!(out.dimensions(), (8, 8));
        assert!(out.samples().iter().all(|&s| (0.0..=1.0).contains(&s)));
    }

    #[test]
    fn test_reinhard_is_monotonic_on_gray_ramp() {
        let samples: Vec<f32> = (0..16).flat_map(|i| [i as f32 / 15.0; 3]).collect();
        let ramp = PixelBuffer::from_raw(16, 1, ChannelOrder::Rgb, samples).unwrap();
        let out = Reinhard::default().process(&ramp).unwrap();
        let reds: Vec<f32> = out.pixels().map(|px| px[0]).collect();
        assert!(reds.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_reinhard_rejects_flat_image() {
        let flat = PixelBuffer::filled(4, 4, ChannelOrder::Rgb, 0.5f32);
        assert_eq!(Reinhard::default().process(&flat), Err(ToneMapError::DegenerateRange));
    }

    #[test]
    fn test_reinhard_rejects_rgba() {
        let rgba = PixelBuffer::filled(2, 2, ChannelOrder::Rgba, 0.5f32);
        assert_eq!(
            Reinhard::default().process(&rgba),
            Err(ToneMapError::UnsupportedChannels(ChannelOrder::Rgba))
        );
    }
}
