//! Drago adaptive logarithmic operator.
//!
//! # Reference
//! Drago, F. et al., "Adaptive Logarithmic Mapping For Displaying High
//! Contrast Scenes" (2003)
//!
//! Luminance is first divided by its log-average `Lw`, then
//!
//! ```text
//! L' = ln(Lw + 1) / ln(2 + 8 × (Lw / Lmax)^(ln(bias) / ln(0.5)))
//! ```
//!
//! `bias` in `[0.7, 0.9]` trades shadow detail against highlight contrast.

use crate::error::ToneMapError;
use crate::image::PixelBuffer;
use crate::tonemap::ToneMapOperator;
use crate::tonemap::common::{finish, gray, map_luminance, normalize_linear, rgb_pixels, safe_ln};

/// Drago logarithmic operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drago {
    /// Gamma of the final correction curve.
    pub gamma: f32,
    /// Color saturation; 1.0 keeps the input ratios.
    pub saturation: f32,
    /// Bias of the logarithm base, `[0.7, 0.9]` is the useful range.
    pub bias: f32,
}

impl Default for Drago {
    fn default() -> Self {
        Self {
            gamma: 1.0,
            saturation: 1.0,
            bias: 0.85,
        }
    }
}

impl ToneMapOperator for Drago {
    fn name(&self) -> &'static str {
        "Drago"
    }

    fn process(&self, image: &PixelBuffer<f32>) -> Result<PixelBuffer<f32>, ToneMapError> {
        let mut pixels = rgb_pixels(image)?;
        normalize_linear(&mut pixels)?;
        let count = pixels.len() as f64;

        let mut lum: Vec<f32> = pixels.iter().map(|&px| gray(px)).collect();
        let log_mean = lum.iter().map(|&l| safe_ln(l) as f64).sum::<f64>() / count;
        let mean = log_mean.exp() as f32;
        for l in lum.iter_mut() {
            *l /= mean;
        }

        let max = lum.iter().copied().fold(0.0_f32, f32::max);
        if max <= 0.0 {
            return Err(ToneMapError::DegenerateRange);
        }

        let exponent = self.bias.ln() / 0.5_f32.ln();
        let new_lum: Vec<f32> = lum
            .iter()
            .map(|&l| {
                let div = (2.0 + 8.0 * (l / max).powf(exponent)).ln();
                (l + 1.0).ln() / div
            })
            .collect();

        map_luminance(&mut pixels, &lum, &new_lum, self.saturation);
        finish(image, pixels, self.gamma)
    }
}
