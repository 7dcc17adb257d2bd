//! Configuration file handling

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Log tailer settings
    #[serde(default)]
    pub tailer: TailerConfig,

    /// Artifact settings
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize)]
pub struct Timeouts {
    /// How long to wait for a step's expected output
    #[serde(default = "default_expect")]
    pub expect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            expect_secs: default_expect(),
        }
    }
}

fn default_expect() -> u64 {
    10
}

/// Log tailer configuration
#[derive(Debug, Deserialize)]
pub struct TailerConfig {
    /// Sleep between polls once the device log is exhausted
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Maximum number of lines queued between the tailer and the matcher
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_poll_interval() -> u64 {
    250
}
fn default_channel_capacity() -> usize {
    4096
}

/// Artifact configuration
#[derive(Debug, Deserialize)]
pub struct ArtifactsConfig {
    /// File names that make up one group's build output
    #[serde(default = "default_artifact_files")]
    pub files: Vec<String>,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            files: default_artifact_files(),
        }
    }
}

fn default_artifact_files() -> Vec<String> {
    ["mcuboot.bin", "signed-hello1.bin", "signed-hello2.bin"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        let config: Self =
            toml::from_str(&content).map_err(|e| super::Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.tailer.channel_capacity == 0 {
            return Err(super::Error::Config(
                "tailer.channel_capacity must be at least 1".to_string(),
            ));
        }
        if self.artifacts.files.is_empty() {
            return Err(super::Error::Config(
                "artifacts.files must name at least one file".to_string(),
            ));
        }
        Ok(())
    }

    pub fn expect_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.expect_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.tailer.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.expect_timeout(), Duration::from_secs(10));
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.tailer.channel_capacity, 4096);
        assert_eq!(config.artifacts.files.len(), 3);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[timeouts]\nexpect_secs = 30\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.timeouts.expect_secs, 30);
        assert_eq!(config.tailer.poll_interval_ms, 250);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tailer]\nchannel_capacity = 0\n").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(crate::Error::Config(_))
        ));
    }
}
