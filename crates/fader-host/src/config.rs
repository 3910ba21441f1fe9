//! Host configuration persisted as YAML in the user config directory

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use fader_core::audio::AudioConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HostConfig {
    pub audio: AudioConfig,
    pub presets: PresetConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetConfig {
    /// Where `save`/`load` presets live
    pub directory: PathBuf,
}

impl Default for PresetConfig {
    fn default() -> Self {
        Self {
            directory: default_preset_dir(),
        }
    }
}

fn config_root() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fader")
}

pub fn default_config_path() -> PathBuf {
    config_root().join("config.yaml")
}

pub fn default_preset_dir() -> PathBuf {
    config_root().join("presets")
}

/// Load the config, falling back to defaults on any problem
///
/// A broken config file must not keep the host from starting; the
/// problem is logged and defaults are used.
pub fn load_config(path: &Path) -> HostConfig {
    if !path.exists() {
        log::info!("No config file at {}, using defaults", path.display());
        return HostConfig::default();
    }
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str(&contents) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!(
                    "Failed to parse config {}: {}, using defaults",
                    path.display(),
                    e
                );
                HostConfig::default()
            }
        },
        Err(e) => {
            log::warn!(
                "Failed to read config {}: {}, using defaults",
                path.display(),
                e
            );
            HostConfig::default()
        }
    }
}

pub fn save_config(config: &HostConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create config directory {}", parent.display())
        })?;
    }
    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    log::info!("Saved config to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fader_core::audio::{BufferSize, DeviceId};

    #[test]
    fn test_defaults() {
        let config = HostConfig::default();
        assert!(config.audio.device.is_none());
        assert_eq!(config.audio.buffer_size, BufferSize::Fixed(512));
        assert!(config.presets.directory.ends_with("presets"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = HostConfig::default();
        config.audio = config
            .audio
            .with_device(DeviceId::with_host("hw:1", "ALSA"))
            .with_buffer_frames(256)
            .with_sample_rate(44100);

        save_config(&config, &path).unwrap();
        assert_eq!(load_config(&path), config);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.yaml");
        assert_eq!(load_config(&path), HostConfig::default());
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "audio: [not, a, mapping").unwrap();
        assert_eq!(load_config(&path), HostConfig::default());
    }
}
