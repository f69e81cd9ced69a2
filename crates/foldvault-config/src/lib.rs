//! Configuration management for FoldVault
//!
//! This crate layers engine configuration from built-in defaults, an optional
//! YAML, TOML or JSON file, `FOLDVAULT__*` environment variables and a data
//! directory override, then validates every section.
//!
//! # Sections
//!
//! - **selector**, **pipeline**, **codecs**: how content is folded
//! - **index**, **memory**: what is remembered about content
//! - **vault**: content size limit and data directory
//! - **logging**: level and output format
//!
//! # Examples
//!
//! ```rust,no_run
//! use foldvault_config::{ConfigBuilder, ENV_PREFIX};
//!
//! let config = ConfigBuilder::new()
//!     .file("foldvault.yaml")
//!     .env(ENV_PREFIX)
//!     .build()
//!     .expect("Failed to load configuration");
//!
//! println!("Max stages: {}", config.pipeline.max_stages);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use foldvault_types::{CodecConfig, IndexConfig, MemoryConfig, PipelineConfig, SelectorConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod builder;
pub mod error;
pub mod format;
pub mod loader;

pub use builder::ConfigBuilder;
pub use error::{ConfigError, ConfigResult};
pub use format::ConfigFormat;
pub use loader::ConfigLoader;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "FOLDVAULT";

/// Pattern memory snapshot file name inside the data directory
pub const SNAPSHOT_FILE: &str = "patterns.bin";

/// Main configuration structure for FoldVault
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Size bands and trial cap of the adaptive selector
    pub selector: SelectorConfig,
    /// Stage limits of the folding pipeline
    pub pipeline: PipelineConfig,
    /// Codec parameters
    pub codecs: CodecConfig,
    /// Content index limits
    pub index: IndexConfig,
    /// Pattern memory capacity and persistence
    pub memory: MemoryConfig,
    /// Vault limits and location
    pub vault: VaultConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Check every section, then the limits that span sections
    pub fn validate(&self) -> ConfigResult<()> {
        self.selector
            .validate()
            .map_err(|e| ConfigError::invalid_value("selector", e))?;
        self.pipeline
            .validate()
            .map_err(|e| ConfigError::invalid_value("pipeline", e))?;
        self.codecs
            .validate()
            .map_err(|e| ConfigError::invalid_value("codecs", e))?;
        self.index
            .validate()
            .map_err(|e| ConfigError::invalid_value("index", e))?;
        self.memory
            .validate()
            .map_err(|e| ConfigError::invalid_value("memory", e))?;
        self.vault.validate(&self.codecs)?;
        self.logging.validate()
    }
}

/// Vault-level limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Largest content accepted by `store`
    pub max_content_size: usize,
    /// Directory used by the filesystem storage backend
    pub data_dir: PathBuf,
}

impl VaultConfig {
    /// Stored content must fit within what the codecs may decode
    fn validate(&self, codecs: &CodecConfig) -> ConfigResult<()> {
        if self.max_content_size == 0 {
            return Err(ConfigError::invalid_value(
                "vault.max_content_size",
                "must be greater than 0",
            ));
        }
        if self.max_content_size > codecs.max_decoded_size {
            return Err(ConfigError::invalid_value(
                "vault.max_content_size",
                format!(
                    "{} exceeds codecs.max_decoded_size {}",
                    self.max_content_size, codecs.max_decoded_size
                ),
            ));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid_value("vault.data_dir", "must not be empty"));
        }
        Ok(())
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            max_content_size: 64 * 1024 * 1024, // 64MB
            data_dir: PathBuf::from("foldvault-data"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Enable JSON formatting
    pub json_format: bool,
    /// Enable colored output
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            colored_output: true,
        }
    }
}

impl LoggingConfig {
    /// Accepted log levels
    pub const LEVELS: [&'static str; 5] = ["trace", "debug", "info", "warn", "error"];

    fn validate(&self) -> ConfigResult<()> {
        if Self::LEVELS.contains(&self.level.as_str()) {
            return Ok(());
        }
        Err(ConfigError::invalid_value(
            "logging.level",
            format!("must be one of {}, got '{}'", Self::LEVELS.join(", "), self.level),
        ))
    }
}
