//! Lumen Core: HDR-style photo processing.
//!
//! A run loads an 8-bit image, multiplies it by an exposure gain, remaps
//! shadow lightness in CIE L\*a\*b\*, optionally applies a global tone-mapping
//! curve, and writes the result at a chosen compression level. No UI or
//! logging-backend dependencies; events go through `tracing`.

pub mod adjust;
pub mod error;
pub mod image;
pub mod io;
pub mod pipeline;
pub mod settings;
pub mod tonemap;

// Re-exports for convenience.
pub use error::{DecodeError, EncodeError, SettingsError, ToneMapError};
pub use crate::image::{ChannelOrder, PixelBuffer, Sample, SampleType};
pub use pipeline::{HdrProcessor, ProcessingParameters};
pub use settings::PersistedSettings;
pub use tonemap::{BuiltinOperators, ToneMapBackend, ToneMapOperator, ToneMapping};
