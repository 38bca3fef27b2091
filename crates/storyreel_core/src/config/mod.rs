//! Application configuration.
//!
//! Settings are organized into TOML sections with per-field serde
//! defaults, so a partial config file (or none at all) always yields a
//! usable configuration. Saves are atomic: write to a temp file, then
//! rename over the target.

mod settings;

pub use settings::{EngineSettings, EngineSource, OutputSettings, Settings};

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

impl Settings {
    /// Load settings from the given path, or defaults if it is absent.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Save settings to the given path atomically.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let text = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp: PathBuf = path.with_extension("toml.tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.output.codec, "libx264");
        assert!(!settings.engine.sources.is_empty());
    }

    #[test]
    fn save_and_reload_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.output.crf = 18;
        settings.save(&path).unwrap();

        let loaded = Settings::load_or_default(&path).unwrap();
        assert_eq!(loaded.output.crf, 18);
    }

    #[test]
    fn partial_config_fills_missing_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[output]\ncrf = 20\n").unwrap();

        let loaded = Settings::load_or_default(&path).unwrap();
        assert_eq!(loaded.output.crf, 20);
        assert_eq!(loaded.output.preset, "medium");
        assert_eq!(loaded.engine.manifest_timeout_secs, 10);
    }
}
