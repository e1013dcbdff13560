use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    llm::ollama::{DEFAULT_MODEL, OLLAMA_DEFAULT_URL},
    model::TemperatureUnit,
    provider::openweather::OPENWEATHER_BASE_URL,
};

pub const ENV_API_KEY: &str = "WEATHERWISE_API_KEY";
pub const ENV_MODEL: &str = "WEATHERWISE_MODEL";
pub const ENV_OLLAMA_URL: &str = "WEATHERWISE_OLLAMA_URL";

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Example TOML:
/// [openweather]
/// api_key = "..."
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OpenWeatherConfig {
    pub api_key: Option<String>,
    /// Override for tests or proxies.
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl OpenWeatherConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(OPENWEATHER_BASE_URL)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

/// Local language model used to phrase clothing advice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdviceConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: OLLAMA_DEFAULT_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub unit: TemperatureUnit,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub openweather: OpenWeatherConfig,
    pub advice: AdviceConfig,
    pub display: DisplayConfig,
}

impl Config {
    /// Load config from disk (or defaults on first run), then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::load_from(&Self::config_file_path()?)?;
        cfg.apply_overrides(|name| std::env::var(name).ok());
        Ok(cfg)
    }

    /// Load config from `path`, or return an empty default if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weatherwise", "weatherwise")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Overlay values from `lookup` (normally the process environment).
    /// Blank values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.openweather.api_key = Some(key);
        }
        if let Some(model) = get(ENV_MODEL) {
            self.advice.model = model;
        }
        if let Some(url) = get(ENV_OLLAMA_URL) {
            self.advice.endpoint = url;
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.openweather.api_key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.openweather.api_key = Some(api_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_enable_advice_with_local_model() {
        let cfg = Config::default();

        assert!(cfg.advice.enabled);
        assert_eq!(cfg.advice.endpoint, OLLAMA_DEFAULT_URL);
        assert_eq!(cfg.api_key(), None);
        assert_eq!(cfg.openweather.base_url(), OPENWEATHER_BASE_URL);
        assert_eq!(cfg.openweather.timeout(), Duration::from_secs(10));
        assert_eq!(cfg.display.unit, TemperatureUnit::Celsius);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("nope.toml")).unwrap();

        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_api_key("OPEN_KEY".into());
        cfg.advice.enabled = false;
        cfg.display.unit = TemperatureUnit::Fahrenheit;
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[openweather]\napi_key = \"abc\"\n\n[advice]\nmodel = \"qwen2.5:0.5b\"\n")
            .unwrap();

        let cfg = Config::load_from(&path).unwrap();

        assert_eq!(cfg.api_key(), Some("abc"));
        assert_eq!(cfg.advice.model, "qwen2.5:0.5b");
        assert!(cfg.advice.enabled);
        assert_eq!(cfg.advice.endpoint, OLLAMA_DEFAULT_URL);
    }

    #[test]
    fn invalid_toml_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "this is = = not toml").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn environment_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_KEY, "ENV_KEY"),
            (ENV_MODEL, "llama3.2:3b"),
            (ENV_OLLAMA_URL, "  "),
        ]);

        let mut cfg = Config::default();
        cfg.set_api_key("FILE_KEY".into());
        cfg.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(cfg.api_key(), Some("ENV_KEY"));
        assert_eq!(cfg.advice.model, "llama3.2:3b");
        assert_eq!(cfg.advice.endpoint, OLLAMA_DEFAULT_URL);
    }

    #[test]
    fn empty_api_key_counts_as_missing() {
        let mut cfg = Config::default();
        cfg.set_api_key(String::new());

        assert_eq!(cfg.api_key(), None);
    }
}
