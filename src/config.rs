use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "bunker.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RevealSetting {
    /// Hold if the terminal reports key releases, toggle otherwise.
    #[default]
    Auto,
    Hold,
    Toggle,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base: String,
    pub request_timeout_secs: u64,
    pub log_file: PathBuf,
    /// Room files to use instead of the built-in ones.
    pub rooms_dir: Option<PathBuf>,
    pub hold_to_reveal: RevealSetting,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base: "http://localhost:8000/api".to_string(),
            request_timeout_secs: 30,
            log_file: PathBuf::from("bunker.log"),
            rooms_dir: None,
            hold_to_reveal: RevealSetting::Auto,
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Reads `path` if given (it must exist), else `bunker.toml` in the
    /// working directory when present, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Config::default());
                }
                default
            }
        };
        let content = std::fs::read_to_string(&path).with_context(|| format!("reading config {}", path.display()))?;
        Config::from_toml(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.api_base, "http://localhost:8000/api");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.hold_to_reveal, RevealSetting::Auto);
        assert!(config.rooms_dir.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let config = Config::from_toml(
            r#"
api_base = "https://bunker.example/api"
request_timeout_secs = 5
rooms_dir = "rooms"
hold_to_reveal = "toggle"
"#,
        )
        .unwrap();
        assert_eq!(config.api_base, "https://bunker.example/api");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.rooms_dir, Some(PathBuf::from("rooms")));
        assert_eq!(config.hold_to_reveal, RevealSetting::Toggle);
        assert_eq!(config.log_file, PathBuf::from("bunker.log"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = Config::load(Some(&temp_dir.path().join("nope.toml"))).unwrap_err();
        assert!(format!("{:#}", err).contains("nope.toml"));
    }

    #[test]
    fn loads_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bunker.toml");
        std::fs::write(&path, "request_timeout_secs = 0\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        // zero would make every request time out immediately
        assert_eq!(config.request_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn unknown_reveal_setting_is_rejected() {
        assert!(Config::from_toml("hold_to_reveal = \"sometimes\"").is_err());
    }
}
