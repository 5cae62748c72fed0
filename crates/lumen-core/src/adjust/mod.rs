//! Pixel adjustments applied before tone mapping: exposure gain and
//! luma-only shadow remapping.

pub mod exposure;
pub mod shadow;

pub use exposure::apply_exposure;
pub use shadow::{apply_shadow, apply_shadow_to};
