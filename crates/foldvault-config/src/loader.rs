//! Configuration loading entry points

use crate::format::ConfigFormat;
use crate::{Config, ConfigBuilder, ConfigError, ConfigResult, ENV_PREFIX};
use std::path::{Path, PathBuf};

/// File names looked up in the working directory
const LOCAL_FILES: [&str; 6] = [
    "foldvault.yaml",
    "foldvault.yml",
    "foldvault.toml",
    ".foldvault.yaml",
    ".foldvault.yml",
    ".foldvault.toml",
];

/// File names looked up in the user and system configuration directories
const SHARED_FILES: [&str; 3] = ["config.yaml", "config.yml", "config.toml"];

/// Loads and saves engine configuration
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, the first file in [`ConfigLoader::search_paths`], then the
    /// environment
    pub fn load_default() -> ConfigResult<Config> {
        Self::load(None, None)
    }

    /// Load `file` when given, otherwise discover one
    ///
    /// `data_dir` replaces `vault.data_dir` from every other layer.
    pub fn load(file: Option<&Path>, data_dir: Option<&Path>) -> ConfigResult<Config> {
        let builder = match file {
            Some(path) => ConfigBuilder::new().file(path),
            None => ConfigBuilder::new().discover(),
        };
        builder
            .env(ENV_PREFIX)
            .data_dir(data_dir.map(Path::to_path_buf))
            .build()
    }

    /// Write `config` in the format named by the extension of `path`
    pub fn save_to_file<P: AsRef<Path>>(config: &Config, path: P) -> ConfigResult<()> {
        let path = path.as_ref();
        let content = ConfigFormat::from_path(path).render(config)?;
        std::fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Candidate configuration files in order of preference
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = LOCAL_FILES.iter().map(PathBuf::from).collect();

        if let Some(config_dir) = dirs::config_dir() {
            let user_dir = config_dir.join("foldvault");
            paths.extend(SHARED_FILES.iter().map(|name| user_dir.join(name)));
        }

        #[cfg(unix)]
        paths.extend(
            SHARED_FILES
                .iter()
                .map(|name| Path::new("/etc/foldvault").join(name)),
        );

        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SNAPSHOT_FILE;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.yaml");

        let mut original_config = Config::default();
        original_config.selector.max_trials = 2;
        ConfigLoader::save_to_file(&original_config, &config_path).unwrap();

        let loaded_config = ConfigLoader::load(Some(config_path.as_path()), None).unwrap();
        assert_eq!(loaded_config.selector.max_trials, 2);
        assert_eq!(loaded_config.pipeline, original_config.pipeline);
    }

    #[test]
    fn test_save_and_load_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let mut original_config = Config::default();
        original_config.index.segment_size = 4096;
        ConfigLoader::save_to_file(&original_config, &config_path).unwrap();

        let loaded_config = ConfigLoader::load(Some(config_path.as_path()), None).unwrap();
        assert_eq!(loaded_config.index.segment_size, 4096);
    }

    #[test]
    fn test_load_with_data_dir_override() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("vault.json");
        ConfigLoader::save_to_file(&Config::default(), &config_path).unwrap();

        let vault = temp_dir.path().join("vault");
        let config = ConfigLoader::load(Some(config_path.as_path()), Some(vault.as_path())).unwrap();
        assert_eq!(config.vault.data_dir, vault);
        assert_eq!(config.memory.snapshot_path, Some(vault.join(SNAPSHOT_FILE)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConfigLoader::load(Some(Path::new("/nonexistent/foldvault.yaml")), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_save_into_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("absent").join("config.yaml");

        let err = ConfigLoader::save_to_file(&Config::default(), &config_path).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_search_paths_prefer_working_directory() {
        let paths = ConfigLoader::search_paths();
        assert_eq!(paths[0], PathBuf::from("foldvault.yaml"));
        assert!(paths[..LOCAL_FILES.len()].iter().all(|path| path.is_relative()));
        assert!(paths[LOCAL_FILES.len()..].iter().all(|path| path.is_absolute()));
    }
}
