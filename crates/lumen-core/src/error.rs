//! Error types for every fallible stage.
//!
//! None of these escape [`HdrProcessor`](crate::pipeline::HdrProcessor): the
//! pipeline logs them and degrades to "no result" or "unchanged buffer".

use std::path::PathBuf;

use crate::image::ChannelOrder;

/// Interleaved sample count does not match the declared shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("buffer size mismatch: expected {expected} samples, got {actual}")]
pub struct BufferSizeError {
    pub expected: usize,
    pub actual: usize,
}

/// Source image could not be read or decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("decoded image has an invalid layout: {0}")]
    Layout(#[from] BufferSizeError),
}

/// A tone-map operator could not process a buffer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToneMapError {
    #[error("image has no pixels")]
    EmptyImage,
    #[error("unsupported channel layout: {0}")]
    UnsupportedChannels(ChannelOrder),
    #[error("intensity range collapsed to a single value")]
    DegenerateRange,
    #[error("operator produced non-finite values")]
    NonFinite,
    #[error("{0}")]
    Operator(String),
}

/// Output file could not be written.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("compression level {level} is outside {min}..={max}")]
    InvalidCompressionLevel { level: i32, min: i32, max: i32 },
    #[error("no encoder for output path {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Settings file could not be read. Never surfaces past the loader.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed settings: {0}")]
    Json(#[from] serde_json::Error),
    #[error("settings must be a JSON object, found {0}")]
    NotAnObject(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BufferSizeError {
            expected: 12,
            actual: 9,
        };
        assert_eq!(
            err.to_string(),
            "buffer size mismatch: expected 12 samples, got 9"
        );

        let err = EncodeError::InvalidCompressionLevel {
            level: 12,
            min: -1,
            max: 9,
        };
        assert_eq!(err.to_string(), "compression level 12 is outside -1..=9");

        let err = ToneMapError::UnsupportedChannels(ChannelOrder::Luma);
        assert_eq!(err.to_string(), "unsupported channel layout: luma");
    }
}
