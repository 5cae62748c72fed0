//! Per-session processing parameters.
//!
//! `ProcessingParameters` is the single record every stage reads. The
//! processor hands out copies, so a run never observes a half-applied change.

use crate::io::sink::DEFAULT_COMPRESSION_LEVEL;
use crate::tonemap::ToneMapping;

/// Smallest exposure or shadow factor the record will hold.
pub const MIN_GAIN: f32 = 0.1;

/// Coerce a requested gain into the stored range.
///
/// Values below [`MIN_GAIN`] and NaN become [`MIN_GAIN`]. Values beyond
/// `f32::MAX` saturate.
pub fn clamp_gain(value: f64) -> f32 {
    if value.is_nan() {
        return MIN_GAIN;
    }
    (value.min(f32::MAX as f64) as f32).max(MIN_GAIN)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessingParameters {
    exposure: f32,
    shadow: f32,
    /// Tone-mapping curve applied after exposure and shadow.
    pub tone_mapping: ToneMapping,
    /// Stored as given; validated by the encoder at save time.
    pub compression_level: i32,
}

impl Default for ProcessingParameters {
    fn default() -> Self {
        Self {
            exposure: 1.0,
            shadow: 1.0,
            tone_mapping: ToneMapping::None,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl ProcessingParameters {
    /// Exposure gain, always `>= MIN_GAIN`.
    pub fn exposure(&self) -> f32 {
        self.exposure
    }

    /// Shadow divisor for L\*, always `>= MIN_GAIN`.
    pub fn shadow(&self) -> f32 {
        self.shadow
    }

    pub fn set_exposure(&mut self, value: impl Into<f64>) {
        self.exposure = clamp_gain(value.into());
    }

    pub fn set_shadow(&mut self, value: impl Into<f64>) {
        self.shadow = clamp_gain(value.into());
    }

    /// Builder form of [`set_exposure`](Self::set_exposure).
    pub fn with_exposure(mut self, value: impl Into<f64>) -> Self {
        self.set_exposure(value);
        self
    }

    /// Builder form of [`set_shadow`](Self::set_shadow).
    pub fn with_shadow(mut self, value: impl Into<f64>) -> Self {
        self.set_shadow(value);
        self
    }

    pub fn with_tone_mapping(mut self, mapping: ToneMapping) -> Self {
        self.tone_mapping = mapping;
        self
    }

    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = ProcessingParameters::default();
        assert_eq!(p.exposure(), 1.0);
        assert_eq!(p.shadow(), 1.0);
        assert_eq!(p.tone_mapping, ToneMapping::None);
        assert_eq!(p.compression_level, 3);
    }

    #[test]
    fn test_clamp_gain() {
        assert_eq!(clamp_gain(2.0), 2.0);
        assert_eq!(clamp_gain(0.1), MIN_GAIN);
        assert_eq!(clamp_gain(0.05), MIN_GAIN);
        assert_eq!(clamp_gain(0.0), MIN_GAIN);
        assert_eq!(clamp_gain(-3.0), MIN_GAIN);
        assert_eq!(clamp_gain(f64::NAN), MIN_GAIN);
        assert_eq!(clamp_gain(f64::NEG_INFINITY), MIN_GAIN);
        assert_eq!(clamp_gain(f64::INFINITY), f32::MAX);
        assert_eq!(clamp_gain(1e300), f32::MAX);
    }

    #[test]
    fn test_setters_accept_integers_and_floats() {
        let mut p = ProcessingParameters::default();
        p.set_exposure(3);
        assert_eq!(p.exposure(), 3.0);
        p.set_shadow(0.5f32);
        assert_eq!(p.shadow(), 0.5);
        p.set_shadow(-1);
        assert_eq!(p.shadow(), MIN_GAIN);
    }

    #[test]
    fn test_builders() {
        let p = ProcessingParameters::default()
            .with_exposure(2.0)
            .with_shadow(0.0)
            .with_tone_mapping(ToneMapping::Drago)
            .with_compression_level(42);
        assert_eq!(p.exposure(), 2.0);
        assert_eq!(p.shadow(), MIN_GAIN);
        assert_eq!(p.tone_mapping, ToneMapping::Drago);
        assert_eq!(p.compression_level, 42);
    }
}
