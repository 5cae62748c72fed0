//! Building blocks shared by the built-in operators.

use crate::error::ToneMapError;
use crate::image::{ChannelOrder, PixelBuffer};

/// Floor applied to luminance before taking logarithms.
pub(crate) const LOG_EPSILON: f32 = 1e-4;

/// Rec. 601 luma weights, as used by a BGR→GRAY conversion.
const LUMA_REC601: [f32; 3] = [0.299, 0.587, 0.114];

/// Unpack an RGB float buffer into pixel triples.
pub(crate) fn rgb_pixels(image: &PixelBuffer<f32>) -> Result<Vec<[f32; 3]>, ToneMapError> {
    if image.is_empty() {
        return Err(ToneMapError::EmptyImage);
    }
    if image.channels() != ChannelOrder::Rgb {
        return Err(ToneMapError::UnsupportedChannels(image.channels()));
    }
    Ok(image.pixels().map(|px| [px[0], px[1], px[2]]).collect())
}

/// Rec. 601 gray value of one pixel.
#[inline]
pub(crate) fn gray(px: [f32; 3]) -> f32 {
    px[0] * LUMA_REC601[0] + px[1] * LUMA_REC601[1] + px[2] * LUMA_REC601[2]
}

/// Natural log with a floor, so black pixels stay finite.
#[inline]
pub(crate) fn safe_ln(v: f32) -> f32 {
    v.max(LOG_EPSILON).ln()
}

/// Stretch all samples so that the minimum maps to 0 and the maximum to 1.
pub(crate) fn normalize_linear(pixels: &mut [[f32; 3]]) -> Result<(), ToneMapError> {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for px in pixels.iter() {
        for &c in px {
            if !c.is_finite() {
                return Err(ToneMapError::NonFinite);
            }
            min = min.min(c);
            max = max.max(c);
        }
    }

    let range = max - min;
    if range <= f32::EPSILON {
        return Err(ToneMapError::DegenerateRange);
    }

    for px in pixels.iter_mut() {
        for c in px.iter_mut() {
            *c = (*c - min) / range;
        }
    }
    Ok(())
}

/// `out = in^(1 / gamma)`.
pub(crate) fn gamma_correct(pixels: &mut [[f32; 3]], gamma: f32) {
    if (gamma - 1.0).abs() < 1e-7 {
        return;
    }
    let inv = 1.0 / gamma;
    for px in pixels.iter_mut() {
        for c in px.iter_mut() {
            *c = c.max(0.0).powf(inv);
        }
    }
}

/// Replace each pixel's luminance while keeping its color ratios.
///
/// ```text
/// out_c = (in_c / lum)^saturation × new_lum
/// ```
///
/// Pixels with zero luminance become black.
pub(crate) fn map_luminance(pixels: &mut [[f32; 3]], lum: &[f32], new_lum: &[f32], saturation: f32) {
    for ((px, &l), &nl) in pixels.iter_mut().zip(lum).zip(new_lum) {
        for c in px.iter_mut() {
            *c = if l > 0.0 {
                (*c / l).max(0.0).powf(saturation) * nl
            } else {
                0.0
            };
        }
    }
}

/// Final normalize + gamma, then repack into a buffer shaped like `like`.
pub(crate) fn finish(
    like: &PixelBuffer<f32>,
    mut pixels: Vec<[f32; 3]>,
    gamma: f32,
) -> Result<PixelBuffer<f32>, ToneMapError> {
    normalize_linear(&mut pixels)?;
    gamma_correct(&mut pixels, gamma);

    let samples: Vec<f32> = pixels.into_iter().flatten().collect();
    if samples.iter().any(|s| !s.is_finite()) {
        return Err(ToneMapError::NonFinite);
    }

    PixelBuffer::from_raw(like.width(), like.height(), ChannelOrder::Rgb, samples)
        .map_err(|e| ToneMapError::Operator(e.to_string()))
}

/// A single-channel float plane, used for luminance and contrast maps.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Plane {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl Plane {
    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    pub fn dot(&self, other: &Plane) -> f64 {
        self.data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| a as f64 * b as f64)
            .sum()
    }

    /// Halve the resolution with a 2x2 box filter. A trailing odd row or
    /// column is dropped.
    pub fn downsample(&self) -> Plane {
        Plane::from_fn(self.width / 2, self.height / 2, |x, y| {
            let (x0, y0) = (x * 2, y * 2);
            0.25 * (self.at(x0, y0) + self.at(x0 + 1, y0) + self.at(x0, y0 + 1) + self.at(x0 + 1, y0 + 1))
        })
    }

    /// Nearest-neighbor expansion to `width x height`, the transpose of
    /// [`downsample`](Self::downsample) up to a factor of 4. Pixels that
    /// `downsample` dropped receive zero.
    pub fn upsample(&self, width: usize, height: usize) -> Plane {
        Plane::from_fn(width, height, |x, y| {
            let (sx, sy) = (x / 2, y / 2);
            if sx < self.width && sy < self.height {
                self.at(sx, sy)
            } else {
                0.0
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    #[test]
    fn test_normalize_linear_stretches_to_unit_range() {
        let mut px = vec![[0.2, 0.4, 0.6], [0.3, 0.3, 0.3]];
        normalize_linear(&mut px).unwrap();
        assert!((px[0][0] - 0.0).abs() < EPSILON);
        assert!((px[0][2] - 1.0).abs() < EPSILON);
        assert!((px[1][0] - 0.25).abs() < EPSILON);
    }

    #[test]
    fn test_normalize_linear_rejects_flat_input() {
        let mut px = vec![[0.5, 0.5, 0.5]; 4];
        assert_eq!(normalize_linear(&mut px), Err(ToneMapError::DegenerateRange));
    }

    #[test]
    fn test_normalize_linear_rejects_nan() {
        let mut px = vec![[0.5, f32::NAN, 0.5], [0.1, 0.2, 0.3]];
        assert_eq!(normalize_linear(&mut px), Err(ToneMapError::NonFinite));
    }

    #[test]
    fn test_gamma_one_is_identity() {
        let mut px = vec![[0.2, 0.4, 0.6]];
        gamma_correct(&mut px, 1.0);
        assert_eq!(px, vec![[0.2, 0.4, 0.6]]);
    }

    #[test]
    fn test_gamma_above_one_brightens_midtones() {
        let mut px = vec![[0.25, 0.5, 1.0]];
        gamma_correct(&mut px, 2.0);
        assert!((px[0][0] - 0.5).abs() < EPSILON);
        assert!((px[0][2] - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_map_luminance_keeps_ratios_at_unit_saturation() {
        let mut px = vec![[0.2, 0.4, 0.1]];
        let lum = [gray(px[0])];
        let new_lum = [lum[0] * 2.0];
        map_luminance(&mut px, &lum, &new_lum, 1.0);
        assert!((px[0][0] - 0.4).abs() < 1e-5);
        assert!((px[0][1] - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_map_luminance_blackens_zero_luma() {
        let mut px = vec![[0.0, 0.0, 0.0]];
        map_luminance(&mut px, &[0.0], &[0.7], 1.0);
        assert_eq!(px[0], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_plane_downsample_averages_blocks() {
        let plane = Plane::from_fn(5, 4, |x, y| (x + y * 5) as f32);
        let down = plane.downsample();
        assert_eq!((down.width, down.height), (2, 2));
        assert!((down.at(0, 0) - 3.0).abs() < EPSILON);
        assert!((down.at(1, 1) - 15.0).abs() < EPSILON);
    }

    #[test]
    fn test_plane_upsample_is_adjoint_of_downsample() {
        let fine = Plane::from_fn(5, 3, |x, y| (x * 3 + y) as f32 * 0.1);
        let coarse = Plane::from_fn(2, 1, |x, _| 1.0 + x as f32);
        let lhs = fine.downsample().dot(&coarse) * 4.0;
        let rhs = fine.dot(&coarse.upsample(5, 3));
        assert!((lhs - rhs).abs() < 1e-4);
    }
}
