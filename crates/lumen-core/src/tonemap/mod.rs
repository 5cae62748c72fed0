//! Tone-map selection, the operator trait, and the built-in operators.
//!
//! Operators take an RGB buffer normalized to `[0, 1]` and return a buffer of
//! the same shape, also in `[0, 1]`. They may fail; the pipeline treats tone
//! mapping as best-effort and keeps the untransformed buffer when they do.

mod common;
pub mod drago;
pub mod mantiuk;
pub mod reinhard;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ToneMapError;
use crate::image::PixelBuffer;

pub use drago::Drago;
pub use mantiuk::Mantiuk;
pub use reinhard::Reinhard;

/// Selectable tone-mapping curve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToneMapping {
    /// Pass-through.
    #[default]
    None,
    Reinhard,
    Drago,
    Mantiuk,
}

impl ToneMapping {
    /// Name shown in menus and accepted by [`FromStr`].
    pub const fn label(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Reinhard => "Reinhard",
            Self::Drago => "Drago",
            Self::Mantiuk => "Mantiuk",
        }
    }

    pub fn all() -> &'static [Self] {
        const ALL: [ToneMapping; 4] = [
            ToneMapping::None,
            ToneMapping::Reinhard,
            ToneMapping::Drago,
            ToneMapping::Mantiuk,
        ];
        &ALL
    }

    /// Built-in operator for this selection, with its default parameters.
    ///
    /// Returns `None` for [`ToneMapping::None`].
    pub fn operator(self) -> Option<Box<dyn ToneMapOperator>> {
        match self {
            Self::None => None,
            Self::Reinhard => Some(Box::new(Reinhard::default())),
            Self::Drago => Some(Box::new(Drago::default())),
            Self::Mantiuk => Some(Box::new(Mantiuk::default())),
        }
    }
}

impl fmt::Display for ToneMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unknown tone-mapping name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tone mapping {0:?}, expected one of None, Reinhard, Drago, Mantiuk")]
pub struct ParseToneMappingError(pub String);

impl FromStr for ToneMapping {
    type Err = ParseToneMappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::all()
            .iter()
            .copied()
            .find(|m| m.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseToneMappingError(s.to_string()))
    }
}

/// A global tone-mapping curve over a normalized RGB float buffer.
pub trait ToneMapOperator: Send + Sync {
    /// Operator name for logs.
    fn name(&self) -> &'static str;

    /// Map `image` to a new buffer of identical shape.
    fn process(&self, image: &PixelBuffer<f32>) -> Result<PixelBuffer<f32>, ToneMapError>;
}

/// Supplies an operator for each selection.
///
/// The pipeline asks its backend once per run, so implementations can swap
/// in different operators or parameters.
pub trait ToneMapBackend: Send + Sync {
    fn operator(&self, mapping: ToneMapping) -> Option<Box<dyn ToneMapOperator>>;
}

/// The operators in this module, with default parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinOperators;

impl ToneMapBackend for BuiltinOperators {
    fn operator(&self, mapping: ToneMapping) -> Option<Box<dyn ToneMapOperator>> {
        mapping.operator()
    }
}
