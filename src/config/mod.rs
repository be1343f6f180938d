//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables
//! - CLI arguments (applied on top by the binary)
//!
//! ```toml
//! [codec]
//! device = "rotational"
//! persistent_memory = false
//! block_size = 65536
//!
//! [logging]
//! level = "debug"
//! json = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::codec::{BlockCodec, DeviceHint, HwFlags, MAX_BLOCK_SIZE};
use crate::error::{OreError, Result};

/// Default block size for file-level tools (64 KiB).
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

/// Main configuration struct
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Codec configuration
    #[serde(default)]
    pub codec: CodecConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            OreError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from environment variables
    ///
    /// Reads `ORE_DEVICE`, `ORE_PERSISTENT_MEMORY`, `ORE_BLOCK_SIZE` and
    /// `ORE_LOG`. Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(device) = lookup("ORE_DEVICE") {
            if let Ok(device) = device.parse() {
                config.codec.device = device;
            }
        }
        if let Some(val) = lookup("ORE_PERSISTENT_MEMORY") {
            config.codec.persistent_memory =
                matches!(val.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(val) = lookup("ORE_BLOCK_SIZE") {
            if let Ok(val) = val.parse() {
                config.codec.block_size = val;
            }
        }

        // Logging
        if let Some(level) = lookup("ORE_LOG") {
            config.logging.level = level;
        }

        config
    }

    /// Default config file location (`<config dir>/ore/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ore").join("config.toml"))
    }

    /// Load file config (explicit path, else the default path if present)
    /// with environment overrides on top, then validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(path)?,
                None => Self::default(),
            },
        };
        let config = file.merge(Self::from_env());
        config.validate()?;
        Ok(config)
    }

    /// Merge with another config (other takes precedence)
    ///
    /// A field of `other` only wins when it differs from the default.
    pub fn merge(self, other: Self) -> Self {
        let codec_default = CodecConfig::default();
        let logging_default = LoggingConfig::default();
        Self {
            codec: CodecConfig {
                device: if other.codec.device != codec_default.device {
                    other.codec.device
                } else {
                    self.codec.device
                },
                persistent_memory: self.codec.persistent_memory
                    || other.codec.persistent_memory,
                block_size: if other.codec.block_size != codec_default.block_size {
                    other.codec.block_size
                } else {
                    self.codec.block_size
                },
            },
            logging: LoggingConfig {
                level: if other.logging.level != logging_default.level {
                    other.logging.level
                } else {
                    self.logging.level
                },
                json: self.logging.json || other.logging.json,
            },
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.codec.block_size == 0 || self.codec.block_size > MAX_BLOCK_SIZE {
            return Err(OreError::Config(format!(
                "block_size must be in 1..={MAX_BLOCK_SIZE}, got {}",
                self.codec.block_size
            )));
        }
        if self.logging.level.trim().is_empty() {
            return Err(OreError::Config("logging.level must not be empty".into()));
        }
        Ok(())
    }
}

/// Codec configuration for one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Target medium class
    pub device: DeviceHint,

    /// Device is byte-addressable persistent memory
    pub persistent_memory: bool,

    /// Block size used when splitting files
    pub block_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            device: DeviceHint::SolidState,
            persistent_memory: false,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl CodecConfig {
    /// Hardware flags implied by this configuration
    pub fn hw_flags(&self) -> HwFlags {
        let mut flags = HwFlags::new();
        if self.persistent_memory {
            flags.set(HwFlags::PERSISTENT_MEMORY);
        }
        flags
    }

    /// Build the block codec for this device
    pub fn block_codec(&self) -> BlockCodec {
        BlockCodec::new(self.device).with_hw_flags(self.hw_flags())
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
