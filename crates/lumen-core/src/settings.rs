//! Persisted tone-mapping and compression settings.
//!
//! The settings file is a JSON object with two optional keys:
//!
//! ```json
//! { "tone_mapping": "Drago", "compression_level": 6 }
//! ```
//!
//! It is read once at startup and never written here. Exposure and shadow
//! are not part of it; they start at 1.0 every session.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::SettingsError;
use crate::io::sink::DEFAULT_COMPRESSION_LEVEL;
use crate::pipeline::ProcessingParameters;
use crate::tonemap::ToneMapping;

/// File name of the settings file inside the home directory.
pub const SETTINGS_FILE_NAME: &str = ".hdr_photo_maker_config.json";

/// The persisted subset of the processing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSettings {
    /// Tone-mapping curve. Unknown names fall back to `None`.
    #[serde(default, deserialize_with = "lenient_tone_mapping")]
    pub tone_mapping: ToneMapping,
    /// Output compression level. Non-integers fall back to the default.
    #[serde(
        default = "default_compression_level",
        deserialize_with = "lenient_compression_level"
    )]
    pub compression_level: i32,
}

impl Default for PersistedSettings {
    fn default() -> Self {
        Self {
            tone_mapping: ToneMapping::None,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl PersistedSettings {
    /// `$HOME/.hdr_photo_maker_config.json`, when a home directory exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(SETTINGS_FILE_NAME))
    }

    /// Parse settings from JSON text. The document must be an object.
    pub fn from_json_str(content: &str) -> Result<Self, SettingsError> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        if !value.is_object() {
            return Err(SettingsError::NotAnObject(json_kind(&value)));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Read and parse a settings file.
    pub fn try_load(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Read a settings file, falling back to defaults on any failure.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(settings) => {
                tracing::debug!("Loaded settings from {}: {settings:?}", path.display());
                settings
            }
            Err(SettingsError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("Settings file {} not found, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Error loading settings from {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Merge into a parameter record. Exposure and shadow are left alone.
    pub fn apply_to(&self, params: &mut ProcessingParameters) {
        params.tone_mapping = self.tone_mapping;
        params.compression_level = self.compression_level;
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

fn default_compression_level() -> i32 {
    DEFAULT_COMPRESSION_LEVEL
}

fn lenient_tone_mapping<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ToneMapping, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    match value.as_str().map(str::parse::<ToneMapping>) {
        Some(Ok(mapping)) => Ok(mapping),
        _ => {
            tracing::warn!("Ignoring invalid tone_mapping setting {value}");
            Ok(ToneMapping::default())
        }
    }
}

fn lenient_compression_level<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    match value.as_i64().and_then(|n| i32::try_from(n).ok()) {
        Some(level) => Ok(level),
        None => {
            tracing::warn!("Ignoring invalid compression_level setting {value}");
            Ok(DEFAULT_COMPRESSION_LEVEL)
        }
    }
}
