//! Shadow remapping on CIE L\*a\*b\* lightness.
//!
//! Only L\* is touched, so hue and saturation survive while shadow detail is
//! redistributed. A factor below 1 lifts shadows, above 1 darkens them.
//!
//! # Algorithm
//! 1. sRGB → linear sRGB → L\*a\*b\* (D65), in `f32`
//! 2. `L* = clamp(L* / shadow, 0, 100)`
//! 3. L\*a\*b\* with the original a\*/b\* → linear sRGB (gamut clamped) → sRGB
//!
//! The conversion stays in `f32` until the final rounding to 8-bit, so a
//! neutral pixel at `shadow = 1.0` comes back unchanged.

use palette::{IntoColor, Lab, LinSrgb, Srgb};

use crate::image::{ChannelOrder, PixelBuffer};

/// Upper bound of L\*.
const L_MAX: f32 = 100.0;

/// Apply the shadow factor to an optional buffer.
///
/// An absent buffer short-circuits: no conversion is attempted and `None`
/// is returned.
pub fn apply_shadow(buffer: Option<PixelBuffer<u8>>, shadow: f32) -> Option<PixelBuffer<u8>> {
    buffer.map(|buffer| apply_shadow_to(buffer, shadow))
}

/// Apply the shadow factor to a present 8-bit buffer.
///
/// RGB and RGBA pixels go through L\*a\*b\*; alpha is copied. Luma pixels are
/// treated as neutral RGB triples.
pub fn apply_shadow_to(mut buffer: PixelBuffer<u8>, shadow: f32) -> PixelBuffer<u8> {
    let order = buffer.channels();
    let stride = order.count();

    for px in buffer.samples_mut().chunks_exact_mut(stride) {
        match order {
            ChannelOrder::Luma => {
                let [r, g, b] = remap_lightness([px[0], px[0], px[0]], shadow);
                px[0] = ((r as u16 + g as u16 + b as u16 + 1) / 3) as u8;
            }
            ChannelOrder::Rgb | ChannelOrder::Rgba => {
                let out = remap_lightness([px[0], px[1], px[2]], shadow);
                px[..3].copy_from_slice(&out);
            }
        }
    }
    buffer
}

/// Divide the L\* of one sRGB pixel by `shadow`.
fn remap_lightness(rgb: [u8; 3], shadow: f32) -> [u8; 3] {
    let lab = srgb_to_lab(rgb);
    let l = (lab.l / shadow).clamp(0.0, L_MAX);
    lab_to_srgb(Lab::new(l, lab.a, lab.b))
}

pub(crate) fn srgb_to_lab(rgb: [u8; 3]) -> Lab {
    let srgb: Srgb<f32> = Srgb::new(rgb[0], rgb[1], rgb[2]).into_format();
    let lin: LinSrgb<f32> = srgb.into_linear();
    lin.into_color()
}

pub(crate) fn lab_to_srgb(lab: Lab) -> [u8; 3] {
    let lin: LinSrgb<f32> = lab.into_color();
    let srgb: Srgb<u8> = Srgb::<f32>::from_linear(lin).into_format();
    [srgb.red, srgb.green, srgb.blue]
}
