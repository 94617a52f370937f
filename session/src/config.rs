use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use polyspell_core::TriggerConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SpellConfig {
    #[serde(default)]
    pub dictionary: DictionaryConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub locale: LocaleConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl SpellConfig {
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path();
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let raw = fs::read_to_string(config_path)
                .with_context(|| format!("failed to read config file {}", config_path.display()))?;
            let parsed: SpellConfig = toml::from_str(&raw)
                .with_context(|| format!("failed to parse TOML from {}", config_path.display()))?;
            return Ok(parsed);
        }

        Ok(SpellConfig::default())
    }
}

fn resolve_config_path() -> PathBuf {
    if let Ok(path) = env::var("POLYSPELL_CONFIG") {
        return Path::new(&path).to_path_buf();
    }

    if let Some(base) = dirs::config_dir() {
        return base.join("polyspell").join("config.toml");
    }

    env::temp_dir().join("polyspell.toml")
}

#[derive(Debug, Clone, Deserialize)]
pub struct DictionaryConfig {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_min_valid_bytes")]
    pub min_valid_bytes: u64,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            base_url: default_base_url(),
            min_valid_bytes: default_min_valid_bytes(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(env::temp_dir)
        .join("polyspell")
        .join("dictionaries")
}

fn default_base_url() -> String {
    "https://redirector.gvt1.com/edgedl/chrome/dict".to_string()
}

fn default_min_valid_bytes() -> u64 {
    8 * 1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_attached_debounce_ms")]
    pub attached_debounce_ms: u64,
    #[serde(default = "default_min_text_len")]
    pub min_text_len: usize,
    #[serde(default = "default_sample_len")]
    pub sample_len: usize,
    #[serde(default = "default_min_reliability")]
    pub min_reliability: u8,
    #[serde(default = "default_boundary_threshold")]
    pub boundary_threshold: u32,
}

impl DetectionConfig {
    pub fn trigger(&self) -> TriggerConfig {
        TriggerConfig {
            debounce: Duration::from_millis(self.debounce_ms),
            attached_debounce: Duration::from_millis(self.attached_debounce_ms),
            min_text_len: self.min_text_len,
            sample_len: self.sample_len,
            boundary_threshold: self.boundary_threshold,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            attached_debounce_ms: default_attached_debounce_ms(),
            min_text_len: default_min_text_len(),
            sample_len: default_sample_len(),
            min_reliability: default_min_reliability(),
            boundary_threshold: default_boundary_threshold(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    250
}

fn default_attached_debounce_ms() -> u64 {
    750
}

fn default_min_text_len() -> usize {
    8
}

fn default_sample_len() -> usize {
    256
}

fn default_min_reliability() -> u8 {
    polyspell_core::DEFAULT_MIN_RELIABILITY
}

fn default_boundary_threshold() -> u32 {
    2
}

#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
}

impl OracleConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            cache_ttl_ms: default_cache_ttl_ms(),
        }
    }
}

fn default_cache_capacity() -> usize {
    512
}

fn default_cache_ttl_ms() -> u64 {
    4_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocaleConfig {
    #[serde(default = "default_env_override_var")]
    pub env_override_var: String,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            env_override_var: default_env_override_var(),
        }
    }
}

fn default_env_override_var() -> String {
    "LANG".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_alternates_path")]
    pub alternates_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            alternates_path: default_alternates_path(),
        }
    }
}

fn default_alternates_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(env::temp_dir)
        .join("polyspell")
        .join("alternates.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SpellConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.dictionary.min_valid_bytes, 8192);
        assert_eq!(config.detection.debounce_ms, 250);
        assert_eq!(config.oracle.cache_capacity, 512);
        assert_eq!(config.locale.env_override_var, "LANG");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[detection]\ndebounce_ms = 100\n\n[dictionary]\nbase_url = \"http://localhost:9000/dict\"\n",
        )
        .unwrap();

        let config = SpellConfig::load_from(&path).unwrap();
        assert_eq!(config.detection.debounce_ms, 100);
        assert_eq!(config.detection.min_text_len, 8);
        assert_eq!(config.dictionary.base_url, "http://localhost:9000/dict");
        assert_eq!(config.oracle.cache_ttl(), Duration::from_secs(4));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[detection\n").unwrap();
        assert!(SpellConfig::load_from(&path).is_err());
    }
}
