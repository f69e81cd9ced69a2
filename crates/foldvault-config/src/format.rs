//! Configuration file formats

use crate::{Config, ConfigError, ConfigResult};
use config::FileFormat;
use std::path::Path;

/// On-disk format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.yaml`, `.yml` and anything unrecognised
    Yaml,
    /// `.toml`
    Toml,
    /// `.json`
    Json,
}

impl ConfigFormat {
    /// Format for `path`, falling back to YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::Toml,
            Some("json") => Self::Json,
            _ => Self::Yaml,
        }
    }

    /// Matching `config` crate source format
    pub fn file_format(self) -> FileFormat {
        match self {
            Self::Yaml => FileFormat::Yaml,
            Self::Toml => FileFormat::Toml,
            Self::Json => FileFormat::Json,
        }
    }

    /// Serialize `config` in this format
    pub fn render(self, config: &Config) -> ConfigResult<String> {
        let rendered = match self {
            Self::Yaml => serde_yaml::to_string(config).map_err(|e| e.to_string()),
            Self::Toml => toml::to_string_pretty(config).map_err(|e| e.to_string()),
            Self::Json => serde_json::to_string_pretty(config).map_err(|e| e.to_string()),
        };
        rendered.map_err(|message| {
            ConfigError::serialization(format!("Failed to serialize to {:?}: {}", self, message))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("foldvault.yaml", ConfigFormat::Yaml)]
    #[case("foldvault.yml", ConfigFormat::Yaml)]
    #[case("config.toml", ConfigFormat::Toml)]
    #[case("config.json", ConfigFormat::Json)]
    #[case("foldvault", ConfigFormat::Yaml)]
    fn test_from_path(#[case] path: &str, #[case] expected: ConfigFormat) {
        assert_eq!(ConfigFormat::from_path(Path::new(path)), expected);
    }

    #[test]
    fn test_render_json_sections() {
        let text = ConfigFormat::Json.render(&Config::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["pipeline"]["max_stages"], 4);
        assert_eq!(value["memory"]["snapshot_path"], serde_json::Value::Null);
    }

    #[test]
    fn test_render_toml_parses_back() {
        let mut config = Config::default();
        config.index.segment_size = 4096;
        let text = ConfigFormat::Toml.render(&config).unwrap();

        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.index.segment_size, 4096);
        assert_eq!(parsed.codecs, config.codecs);
    }
}
