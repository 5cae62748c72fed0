//! Mantiuk contrast-mapping operator.
//!
//! # Reference
//! Mantiuk, R., Myszkowski, K. and Seidel, H.-P., "A Perceptual Framework
//! for Contrast Processing of High Dynamic Range Images" (2006)
//!
//! # Algorithm
//! 1. Take the log of the luminance
//! 2. Build a pyramid of horizontal/vertical log-contrasts (forward
//!    differences), halving the resolution per level
//! 3. Map each contrast into visual response space (`sign(G) × |G|^0.4185`),
//!    multiply by `scale`, map back
//! 4. Recover the log luminance whose contrast pyramid best matches the
//!    mapped one with a conjugate-gradient solve
//! 5. Re-apply color with `saturation`, stretch, gamma-correct

use crate::error::ToneMapError;
use crate::image::PixelBuffer;
use crate::tonemap::ToneMapOperator;
use crate::tonemap::common::{
    Plane, finish, gray, map_luminance, normalize_linear, rgb_pixels, safe_ln,
};

/// Exponent of the contrast → response transducer.
const RESPONSE_POWER: f32 = 0.4185;
/// Relative residual at which the solver stops.
const TARGET_ERROR: f64 = 1e-3;
const MAX_ITERATIONS: usize = 100;

/// Mantiuk contrast-mapping operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mantiuk {
    /// Gamma of the final correction curve.
    pub gamma: f32,
    /// Contrast scale factor, `[0.6, 0.9]` is the useful range.
    pub scale: f32,
    /// Color saturation; 1.0 keeps the input ratios.
    pub saturation: f32,
}

impl Default for Mantiuk {
    fn default() -> Self {
        Self {
            gamma: 1.0,
            scale: 0.7,
            saturation: 1.0,
        }
    }
}

impl ToneMapOperator for Mantiuk {
    fn name(&self) -> &'static str {
        "Mantiuk"
    }

    fn process(&self, image: &PixelBuffer<f32>) -> Result<PixelBuffer<f32>, ToneMapError> {
        let mut pixels = rgb_pixels(image)?;
        let (width, height) = (image.width() as usize, image.height() as usize);
        if pyramid_levels(width, height) == 0 {
            return Err(ToneMapError::Operator(format!(
                "{width}x{height} is too small for a contrast pyramid"
            )));
        }

        normalize_linear(&mut pixels)?;
        let lum: Vec<f32> = pixels.iter().map(|&px| gray(px)).collect();
        let log_lum = Plane {
            width,
            height,
            data: lum.iter().map(|&l| safe_ln(l)).collect(),
        };

        let mut pyramid = contrast_pyramid(&log_lum);
        for level in &mut pyramid {
            for g in level.x.data.iter_mut().chain(level.y.data.iter_mut()) {
                *g = self.map_contrast(*g);
            }
        }
        let target = pyramid_divergence(&pyramid);

        let solved = solve(&target, log_lum)?;
        let new_lum: Vec<f32> = solved.data.iter().map(|&v| v.exp()).collect();

        map_luminance(&mut pixels, &lum, &new_lum, self.saturation);
        finish(image, pixels, self.gamma)
    }
}

impl Mantiuk {
    fn map_contrast(&self, g: f32) -> f32 {
        let response = signed_pow(g, RESPONSE_POWER) * self.scale;
        signed_pow(response, 1.0 / RESPONSE_POWER)
    }
}

fn signed_pow(v: f32, power: f32) -> f32 {
    v.abs().powf(power).copysign(v)
}

/// Horizontal and vertical contrast at one pyramid level.
struct ContrastLevel {
    x: Plane,
    y: Plane,
}

fn pyramid_levels(width: usize, height: usize) -> usize {
    let min = width.min(height);
    if min < 2 {
        0
    } else {
        min.ilog2() as usize
    }
}

/// Forward differences along x. The last column is zero.
fn gradient_x(src: &Plane) -> Plane {
    Plane::from_fn(src.width, src.height, |x, y| {
        if x + 1 < src.width {
            src.at(x + 1, y) - src.at(x, y)
        } else {
            0.0
        }
    })
}

/// Forward differences along y. The last row is zero.
fn gradient_y(src: &Plane) -> Plane {
    Plane::from_fn(src.width, src.height, |x, y| {
        if y + 1 < src.height {
            src.at(x, y + 1) - src.at(x, y)
        } else {
            0.0
        }
    })
}

/// Backward differences along x, the adjoint of [`gradient_x`] up to sign.
fn divergence_x(src: &Plane) -> Plane {
    Plane::from_fn(src.width, src.height, |x, y| {
        if x == 0 {
            src.at(0, y)
        } else {
            src.at(x, y) - src.at(x - 1, y)
        }
    })
}

fn divergence_y(src: &Plane) -> Plane {
    Plane::from_fn(src.width, src.height, |x, y| {
        if y == 0 {
            src.at(x, 0)
        } else {
            src.at(x, y) - src.at(x, y - 1)
        }
    })
}

fn contrast_pyramid(src: &Plane) -> Vec<ContrastLevel> {
    let levels = pyramid_levels(src.width, src.height);
    let mut out = Vec::with_capacity(levels);
    let mut layer = src.clone();
    for _ in 0..levels {
        out.push(ContrastLevel {
            x: gradient_x(&layer),
            y: gradient_y(&layer),
        });
        layer = layer.downsample();
    }
    out
}

/// Collapse a contrast pyramid into one full-resolution divergence map.
///
/// Coarse levels are expanded with [`Plane::upsample`], so the whole
/// operator stays symmetric and the solver converges.
fn pyramid_divergence(pyramid: &[ContrastLevel]) -> Plane {
    let mut sum: Option<Plane> = None;
    for level in pyramid.iter().rev() {
        let (w, h) = (level.x.width, level.x.height);
        let mut acc = match sum {
            Some(coarse) => coarse.upsample(w, h),
            None => Plane::zeros(w, h),
        };
        let dx = divergence_x(&level.x);
        let dy = divergence_y(&level.y);
        for ((s, a), b) in acc.data.iter_mut().zip(&dx.data).zip(&dy.data) {
            *s += a + b;
        }
        sum = Some(acc);
    }
    sum.unwrap_or_else(|| Plane::zeros(0, 0))
}

fn apply_operator(src: &Plane) -> Plane {
    pyramid_divergence(&contrast_pyramid(src))
}

/// Conjugate-gradient solve of `A x = target`, starting from `x`.
fn solve(target: &Plane, mut x: Plane) -> Result<Plane, ToneMapError> {
    let ax = apply_operator(&x);
    let mut r = Plane {
        width: x.width,
        height: x.height,
        data: target.data.iter().zip(&ax.data).map(|(t, a)| t - a).collect(),
    };
    let mut p = r.clone();

    let target_norm = target.dot(target) * TARGET_ERROR * TARGET_ERROR;
    let mut rr = r.dot(&r);

    for iteration in 0..MAX_ITERATIONS {
        if rr <= target_norm {
            tracing::debug!("Mantiuk solve converged after {iteration} iterations");
            break;
        }

        let product = apply_operator(&p);
        let dprod = p.dot(&product);
        if !dprod.is_finite() || dprod.abs() < f64::MIN_POSITIVE {
            break;
        }
        let alpha = (rr / dprod) as f32;

        for (xi, pi) in x.data.iter_mut().zip(&p.data) {
            *xi += alpha * pi;
        }
        for (ri, qi) in r.data.iter_mut().zip(&product.data) {
            *ri -= alpha * qi;
        }

        let new_rr = r.dot(&r);
        let beta = (new_rr / rr) as f32;
        for (pi, ri) in p.data.iter_mut().zip(&r.data) {
            *pi = ri + beta * *pi;
        }
        rr = new_rr;
    }

    if x.data.iter().any(|v| !v.is_finite()) {
        return Err(ToneMapError::NonFinite);
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ChannelOrder;

    const EPSILON: f32 = 1e-5;

    fn checker(width: u32, height: u32) -> PixelBuffer<f32> {
        let mut samples = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let v = if (x / 2 + y / 2) % 2 == 0 { 0.05 } else { 0.95 };
                let ramp = x as f32 / width as f32 * 0.1;
                samples.extend_from_slice(&[v, v * 0.8 + ramp, v * 0.6]);
            }
        }
        PixelBuffer::from_raw(width, height, ChannelOrder::Rgb, samples).unwrap()
    }

    #[test]
    fn test_signed_pow_keeps_sign() {
        assert!((signed_pow(-4.0, 0.5) + 2.0).abs() < EPSILON);
        assert!((signed_pow(9.0, 0.5) - 3.0).abs() < EPSILON);
        assert_eq!(signed_pow(0.0, 0.4185), 0.0);
    }

    #[test]
    fn test_map_contrast_compresses() {
        let op = Mantiuk::default();
        let g = 0.8;
        let mapped = op.map_contrast(g);
        assert!(mapped > 0.0 && mapped < g);
        assert!((op.map_contrast(-g) + mapped).abs() < EPSILON);
    }

    #[test]
    fn test_pyramid_levels() {
        assert_eq!(pyramid_levels(1, 100), 0);
        assert_eq!(pyramid_levels(8, 8), 3);
        assert_eq!(pyramid_levels(640, 480), 8);
    }

    #[test]
    fn test_operator_on_constant_is_zero() {
        let flat = Plane {
            width: 8,
            height: 8,
            data: vec![0.3; 64],
        };
        let out = apply_operator(&flat);
        assert!(out.data.iter().all(|v| v.abs() < EPSILON));
    }

    #[test]
    fn test_mantiuk_output_in_unit_range() {
        let out = Mantiuk::default().process(&checker(16, 12)).unwrap();
        assert_eq!(out.dimensions(), (16, 12));
        assert!(out.samples().iter().all(|&s| (0.0..=1.0).contains(&s)));
    }

    #[test]
    fn test_mantiuk_rejects_single_row() {
        let row = PixelBuffer::filled(8, 1, ChannelOrder::Rgb, 0.5f32);
        assert!(matches!(
            Mantiuk::default().process(&row),
            Err(ToneMapError::Operator(_))
        ));
    }
}
