//! Configuration management for voice-hat.
//!
//! Configuration is read from a JSON file, with every field optional. The
//! board's device string may be overridden from the environment, which is
//! how the platform tells us what we are running on.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::audio::AudioFormat;
use crate::board::StaticDevice;
use crate::error::{Error, Result};

/// Path of the configuration file, if any.
pub const CONFIG_ENV: &str = "VOICE_HAT_CONFIG";

/// Device string of the running board, overriding `board.device`.
pub const DEVICE_ENV: &str = "VOICE_HAT_DEVICE";

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub board: BoardConfig,
    pub voice_hat: VoiceHatConfig,
    pub peripheral: PeripheralConfig,
}

/// Board identification.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Device string, e.g. "rpi3"
    pub device: Option<String>,
}

/// Voice HAT wiring and stream format, consumed by
/// `VoiceHatDriver::open_with_config`. Unset pins fall back to the board
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct VoiceHatConfig {
    pub i2s_bus: Option<String>,
    pub trigger_gpio: Option<String>,
    pub format: AudioFormat,
}

/// Linux peripheral backend.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PeripheralConfig {
    /// Root of the sysfs GPIO class
    pub gpio_root: PathBuf,

    /// PCM device node backing each I2S bus name. The node must already be
    /// set up for `voice_hat.format`; it is not reconfigured on open.
    pub i2s_nodes: HashMap<String, PathBuf>,
}

impl Default for PeripheralConfig {
    fn default() -> Self {
        Self {
            gpio_root: PathBuf::from("/sys/class/gpio"),
            i2s_nodes: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from `$VOICE_HAT_CONFIG`, or use defaults when it
    /// is unset.
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load_from(Path::new(&path)),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.voice_hat.format.sample_rate == 0 {
            return Err(Error::Config("voice_hat.format.sample_rate must be nonzero".into()));
        }
        if let Some(bus) = &self.voice_hat.i2s_bus {
            if bus.is_empty() {
                return Err(Error::Config("voice_hat.i2s_bus is empty".into()));
            }
        }
        Ok(())
    }

    /// Device string of the running board: `$VOICE_HAT_DEVICE`, else
    /// `board.device`, else empty.
    pub fn device(&self) -> StaticDevice {
        let device = std::env::var(DEVICE_ENV)
            .ok()
            .or_else(|| self.board.device.clone())
            .unwrap_or_default();
        StaticDevice(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{ChannelLayout, Encoding};
    use crate::board::DeviceIdentity;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.voice_hat.format, AudioFormat::VOICE_HAT);
        assert_eq!(config.peripheral.gpio_root, PathBuf::from("/sys/class/gpio"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file() {
        let file = write_temp(
            r#"{
                "board": { "device": "rpi3" },
                "voice_hat": {
                    "format": { "sample_rate": 16000, "encoding": "pcm16", "channels": "stereo" }
                },
                "peripheral": { "i2s_nodes": { "I2S1": "/dev/snd/pcmC0D0p" } }
            }"#,
        );
        let config = Config::load_from(file.path()).unwrap();

        assert_eq!(config.board.device.as_deref(), Some("rpi3"));
        assert_eq!(
            config.voice_hat.format,
            AudioFormat::new(16_000, Encoding::Pcm16Bit, ChannelLayout::Stereo)
        );
        assert_eq!(config.voice_hat.trigger_gpio, None);
        assert_eq!(config.peripheral.gpio_root, PathBuf::from("/sys/class/gpio"));
        assert_eq!(
            config.peripheral.i2s_nodes.get("I2S1"),
            Some(&PathBuf::from("/dev/snd/pcmC0D0p"))
        );
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        let file = write_temp(
            r#"{ "voice_hat": { "format": { "sample_rate": 0, "encoding": "pcm16", "channels": "mono" } } }"#,
        );
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load_from(Path::new("/nonexistent/voice-hat.json")).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.starts_with("reading")));
    }

    #[test]
    #[serial]
    fn test_device_env_override() {
        let config = Config {
            board: BoardConfig {
                device: Some("joule".into()),
            },
            ..Default::default()
        };

        std::env::remove_var(DEVICE_ENV);
        assert_eq!(config.device().device(), "joule");

        std::env::set_var(DEVICE_ENV, "rpi3");
        assert_eq!(config.device().device(), "rpi3");
        std::env::remove_var(DEVICE_ENV);

        assert_eq!(Config::default().device().device(), "");
    }

    #[test]
    #[serial]
    fn test_load_from_env() {
        let file = write_temp(r#"{ "board": { "device": "edison" } }"#);
        std::env::set_var(CONFIG_ENV, file.path());
        let config = Config::load();
        std::env::remove_var(CONFIG_ENV);

        assert_eq!(config.unwrap().board.device.as_deref(), Some("edison"));
        assert_eq!(Config::load().unwrap(), Config::default());
    }
}
