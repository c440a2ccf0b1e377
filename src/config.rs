//! Configuration file handling for sstv-studio.
//!
//! Loads configuration from `<config dir>/sstv-studio/config.toml` or a custom path.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::assets::{AssetStore, OUTPUTS_FOLDER, UPLOADS_FOLDER};
use crate::modes::RecommendPolicy;

/// Configuration file structure for sstv-studio.
/// Loaded from the platform config dir (or custom path via --config).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub encode: EncodeConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub recommend: RecommendPolicy,
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub uploads_dir: PathBuf,
    pub outputs_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from(UPLOADS_FOLDER),
            outputs_dir: PathBuf::from(OUTPUTS_FOLDER),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    pub sample_rate: u32,
    pub bit_depth: u16,
    pub default_mode: String,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            bit_depth: 16,
            default_mode: "MartinM1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub duration_secs: f64,
    /// Input device passed to ffmpeg; the platform default when unset.
    pub device: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            duration_secs: 10.0,
            device: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub max_age_hours: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self { max_age_hours: 24 }
    }
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
                path: path.clone(),
                source: e,
            })?;
            let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.clone(),
                source: e,
            })?;
            log::debug!("Loaded config from '{}'", path.display());
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// The asset store over the configured directories.
    pub fn store(&self) -> AssetStore {
        AssetStore::new(&self.storage.uploads_dir, &self.storage.outputs_dir)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("sstv-studio")
        .join("config.toml")
}

/// Commented config file written by `config init`.
pub const DEFAULT_CONFIG_TOML: &str = r#"# sstv-studio configuration

[storage]
# Inbound images and recordings
uploads_dir = "uploads"
# Generated audio and decoded images
outputs_dir = "data"

[encode]
sample_rate = 44100
# PCM bit depth: 8, 16, 24 or 32
bit_depth = 16
default_mode = "MartinM1"

[capture]
duration_secs = 10.0
# ffmpeg input device (default: platform default input)
# device = "default"

[recommend]
# Images up to this size get small_mode
small_max = [320, 240]
small_mode = "Robot36"
# Images up to this size get medium_mode, larger ones large_mode
medium_max = [640, 496]
medium_mode = "PD120"
large_mode = "PD290"
# Used when the image cannot be read
fallback_mode = "PD90"

[cleanup]
max_age_hours = 24
"#;
