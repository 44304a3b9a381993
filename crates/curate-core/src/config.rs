use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
}

/// Directory query and client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default = "default_true")]
    pub hide_broken: bool,
    #[serde(default = "default_order")]
    pub order: String,
    #[serde(default = "default_true")]
    pub reverse: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Sent as `User-Agent`; the directory asks clients to identify themselves.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Mirrors tried after the last working and discovered servers.
    #[serde(default = "default_servers")]
    pub servers: Vec<String>,
    /// Ask `all.api.radio-browser.info` for the current mirror list.
    #[serde(default = "default_true")]
    pub discover_servers: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Previously curated file; its ids seed the selection.
    #[serde(default = "default_curated_file")]
    pub curated_file: PathBuf,
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
    #[serde(default = "default_export_file_name")]
    pub export_file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "default_volume")]
    pub volume: f32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            tag: default_tag(),
            limit: default_limit(),
            hide_broken: true,
            order: default_order(),
            reverse: true,
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            servers: default_servers(),
            discover_servers: true,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            curated_file: default_curated_file(),
            export_dir: default_export_dir(),
            export_file_name: default_export_file_name(),
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
        }
    }
}

fn default_tag() -> String {
    "ambient".to_string()
}

fn default_limit() -> u32 {
    500
}

fn default_true() -> bool {
    true
}

fn default_order() -> String {
    "clickcount".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "RadioDrift/1.0".to_string()
}

fn default_servers() -> Vec<String> {
    vec![
        "https://fi1.api.radio-browser.info".to_string(),
        "https://de1.api.radio-browser.info".to_string(),
        "https://de2.api.radio-browser.info".to_string(),
    ]
}

fn default_curated_file() -> PathBuf {
    PathBuf::from("ambient-stations.json")
}

/// Exports land in the data dir, never on top of the curated input file.
fn default_export_dir() -> PathBuf {
    platform::data_dir().join("exports")
}

fn default_export_file_name() -> String {
    "ambient-stations.json".to_string()
}

fn default_volume() -> f32 {
    0.5
}

impl PathsConfig {
    pub fn export_path(&self) -> PathBuf {
        self.export_dir.join(&self.export_file_name)
    }
}

impl Config {
    /// Load the user config, writing a default file on first run.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.fetch.tag, "ambient");
        assert_eq!(config.fetch.limit, 500);
        assert!(config.fetch.hide_broken);
        assert!(config.fetch.reverse);
        assert_eq!(config.fetch.order, "clickcount");
        assert_eq!(config.fetch.timeout_secs, 30);
        assert!(config.fetch.servers.iter().all(|s| s.starts_with("https://")));
        assert!(config
            .paths
            .export_path()
            .ends_with("ambient-stations.json"));
    }

    #[test]
    fn test_default_export_does_not_overwrite_curated_file() {
        let paths = PathsConfig::default();
        let export = paths.export_path();
        assert_ne!(export, paths.curated_file);
        assert_ne!(export, Path::new(".").join(&paths.curated_file));
        assert!(export.starts_with(platform::data_dir()));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str("[fetch]\ntag = \"drone\"\n").unwrap();
        assert_eq!(config.fetch.tag, "drone");
        assert_eq!(config.fetch.limit, 500);
        assert_eq!(config.paths.export_file_name, "ambient-stations.json");
        assert_eq!(config.preview.volume, 0.5);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join("config.toml");
        let mut config = Config::default();
        config.fetch.limit = 42;
        config.save_to(&path).unwrap();
        let back = Config::load_from(&path).unwrap();
        assert_eq!(back.fetch.limit, 42);
    }
}
