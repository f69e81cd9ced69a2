//! Layered configuration builder
//!
//! Layers apply in order: built-in defaults, one configuration file,
//! environment variables, then an explicit data directory. The pattern memory
//! snapshot defaults to [`SNAPSHOT_FILE`](crate::SNAPSHOT_FILE) inside the
//! final data directory.

use crate::format::ConfigFormat;
use crate::{Config, ConfigError, ConfigLoader, ConfigResult, SNAPSHOT_FILE};
use config::{Environment, File};
use std::path::{Path, PathBuf};

/// Separator between nested keys in environment variable names
const ENV_SEPARATOR: &str = "__";

/// Where the file layer comes from
#[derive(Debug, Clone, Default)]
enum FileLayer {
    #[default]
    None,
    /// This file, which must exist
    Explicit(PathBuf),
    /// First existing entry of [`ConfigLoader::search_paths`]
    Discover,
}

/// Builds a validated [`Config`] from defaults and overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    file: FileLayer,
    env_prefix: Option<String>,
    data_dir: Option<PathBuf>,
}

impl ConfigBuilder {
    /// Builder with only the built-in defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `path`; a missing file is an error
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = FileLayer::Explicit(path.as_ref().to_path_buf());
        self
    }

    /// Read the first configuration file found in the default locations
    pub fn discover(mut self) -> Self {
        self.file = FileLayer::Discover;
        self
    }

    /// Apply `{prefix}__SECTION__KEY` environment overrides
    pub fn env<S: Into<String>>(mut self, prefix: S) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Override `vault.data_dir` after every other layer
    pub fn data_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.data_dir = dir;
        self
    }

    /// Merge the layers and validate the result
    pub fn build(self) -> ConfigResult<Config> {
        let defaults = serde_yaml::to_value(Config::default())
            .map_err(|e| ConfigError::other(format!("Failed to serialize defaults: {}", e)))?;
        let mut inner = config::Config::builder().add_source(config::Config::try_from(&defaults)?);

        if let Some(path) = self.resolve_file()? {
            let format = ConfigFormat::from_path(&path).file_format();
            inner = inner.add_source(File::from(path).format(format));
        }
        if let Some(prefix) = &self.env_prefix {
            inner = inner.add_source(Environment::with_prefix(prefix).separator(ENV_SEPARATOR));
        }

        let mut config: Config = inner.build()?.try_deserialize()?;
        if let Some(dir) = self.data_dir {
            config.vault.data_dir = dir;
        }
        if config.memory.snapshot_path.is_none() {
            config.memory.snapshot_path = Some(config.vault.data_dir.join(SNAPSHOT_FILE));
        }

        config.validate()?;
        Ok(config)
    }

    fn resolve_file(&self) -> ConfigResult<Option<PathBuf>> {
        match &self.file {
            FileLayer::None => Ok(None),
            FileLayer::Explicit(path) if path.is_file() => Ok(Some(path.clone())),
            FileLayer::Explicit(path) => Err(ConfigError::Io {
                path: path.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Configuration file not found",
                ),
            }),
            FileLayer::Discover => Ok(ConfigLoader::search_paths()
                .into_iter()
                .find(|path| path.is_file())),
        }
    }
}
