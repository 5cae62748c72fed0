//! Application configuration for the command-line front end.

use std::path::PathBuf;

use lumen_core::settings::PersistedSettings;

/// Output directory name under the home directory.
const DEFAULT_OUTPUT_DIR: &str = "HDR_Output";
/// Log directory name under the home directory.
const DEFAULT_LOG_DIR: &str = "HDR_Logs";

/// Where the front end reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Directory receiving processed images.
    pub output_dir: PathBuf,
    /// Directory receiving the session log file.
    pub log_dir: PathBuf,
    /// Persisted settings file, if one can be located.
    pub settings_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var_os(key).map(PathBuf::from))
    }
}

impl AppConfig {
    /// Build from an environment lookup, falling back to home-relative defaults.
    fn from_lookup(lookup: impl Fn(&str) -> Option<PathBuf>) -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            output_dir: lookup("LUMEN_OUTPUT_DIR").unwrap_or_else(|| home.join(DEFAULT_OUTPUT_DIR)),
            log_dir: lookup("LUMEN_LOG_DIR").unwrap_or_else(|| home.join(DEFAULT_LOG_DIR)),
            settings_path: lookup("LUMEN_SETTINGS").or_else(PersistedSettings::default_path),
        }
    }

    /// Apply command-line overrides on top of the environment.
    pub fn with_overrides(mut self, output_dir: Option<PathBuf>, settings: Option<PathBuf>) -> Self {
        if let Some(dir) = output_dir {
            self.output_dir = dir;
        }
        if let Some(path) = settings {
            self.settings_path = Some(path);
        }
        self
    }
}
