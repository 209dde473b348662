//! Transport configuration (`<config dir>/soundbridge/config.toml`).

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{RateRatio, SampleEncoding};
use crate::{Error, Result};

const CONFIG_FILE: &str = "config.toml";

/// How the producer decides when to emulate more samples.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Pacing {
    /// Emulate in response to device demand notifications.
    #[default]
    Audio,
    /// Emulate one video frame per display refresh.
    Clock,
}

/// Settings for one audio session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransportConfig {
    /// Ring buffer capacity in samples.
    pub capacity_samples: usize,
    /// Samples per second emitted by the emulation core.
    pub producer_rate: f64,
    /// Device output rate in Hz.
    pub consumer_rate: u32,
    /// Fixed device buffer size in frames. `None` lets the host decide.
    pub quantum_frames: Option<u32>,
    /// Device output channels. The mono signal is copied to each.
    pub channels: u16,
    pub encoding: SampleEncoding,
    pub pacing: Pacing,
    /// Display refresh rate used by clock pacing.
    pub refresh_rate: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            capacity_samples: 17_000_000,
            producer_rate: 1_786_830.0,
            consumer_rate: 44_100,
            quantum_frames: None,
            channels: 1,
            encoding: SampleEncoding::Unsigned,
            pacing: Pacing::Audio,
            refresh_rate: 60,
        }
    }
}

impl TransportConfig {
    /// Rate ratio between producer and device.
    pub const fn rate(&self) -> RateRatio {
        RateRatio::new(self.producer_rate, self.consumer_rate)
    }

    /// Reject values the transport cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.capacity_samples == 0 {
            return Err(Error::InvalidArgument(
                "capacity_samples must be greater than zero".to_string(),
            ));
        }
        if !(self.producer_rate.is_finite() && self.producer_rate > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "producer_rate must be positive, got {}",
                self.producer_rate
            )));
        }
        if self.consumer_rate == 0 {
            return Err(Error::InvalidArgument(
                "consumer_rate must be greater than zero".to_string(),
            ));
        }
        if self.channels == 0 {
            return Err(Error::InvalidArgument(
                "channels must be greater than zero".to_string(),
            ));
        }
        if self.quantum_frames == Some(0) {
            return Err(Error::InvalidArgument(
                "quantum_frames must be greater than zero".to_string(),
            ));
        }
        if self.refresh_rate == 0 {
            return Err(Error::InvalidArgument(
                "refresh_rate must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Load the config from the default location, falling back to defaults
    /// when no file exists.
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load and validate the config from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write the config to the default location.
    pub fn save(&self) -> Result<PathBuf> {
        let path = config_path()
            .ok_or_else(|| Error::Config("no config directory available".to_string()))?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Write the config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Directory holding soundbridge's config file.
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "soundbridge", "soundbridge").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Full path of the default config file.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests use unwrap for brevity
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TransportConfig::default();
        assert_eq!(config.capacity_samples, 17_000_000);
        assert_eq!(config.consumer_rate, 44_100);
        assert_eq!(config.quantum_frames, None);
        assert_eq!(config.pacing, Pacing::Audio);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_empty() {
        let config: TransportConfig = toml::from_str("").unwrap();
        assert_eq!(config, TransportConfig::default());
    }

    #[test]
    fn test_deserialize_partial() {
        let toml_str = r#"
consumer_rate = 48000
encoding = "signed"
pacing = "clock"
"#;
        let config: TransportConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.consumer_rate, 48_000);
        assert_eq!(config.encoding, SampleEncoding::Signed);
        assert_eq!(config.pacing, Pacing::Clock);
        assert_eq!(config.capacity_samples, 17_000_000);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = TransportConfig {
            capacity_samples: 0,
            ..TransportConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));

        let config = TransportConfig {
            consumer_rate: 0,
            ..TransportConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TransportConfig {
            producer_rate: f64::NAN,
            ..TransportConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TransportConfig {
            quantum_frames: Some(0),
            ..TransportConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let config = TransportConfig {
            capacity_samples: 4096,
            quantum_frames: Some(256),
            channels: 2,
            ..TransportConfig::default()
        };

        config.save_to(&path).unwrap();
        let loaded = TransportConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "capacity_samples = 0\n").unwrap();
        assert!(matches!(
            TransportConfig::load_from(&path),
            Err(Error::InvalidArgument(_))
        ));

        std::fs::write(&path, "capacity_samples = \"many\"\n").unwrap();
        assert!(matches!(
            TransportConfig::load_from(&path),
            Err(Error::TomlDe(_))
        ));
    }

    #[test]
    fn test_rate_from_config() {
        let config = TransportConfig::default();
        assert_eq!(config.rate().input_samples_for(128), 5186);
    }
}
