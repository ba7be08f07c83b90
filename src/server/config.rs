//! Server Configuration
//!
//! Defaults, then an optional YAML file, then `TORTOISE_*` environment
//! variables. CLI flags are applied last by the binary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::model::Quality;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Behavior variant
    #[serde(default)]
    pub variant: ServerVariant,

    /// Model worker configuration
    #[serde(default)]
    pub model: ModelConfig,

    /// Temp storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server behavior variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServerVariant {
    /// Falls back to placeholder audio whenever the model cannot serve a request
    #[default]
    Enhanced,
    /// Reports model failures to the caller
    Basic,
}

impl ServerVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enhanced => "enhanced",
            Self::Basic => "basic",
        }
    }
}

impl fmt::Display for ServerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enhanced" => Ok(Self::Enhanced),
            "basic" => Ok(Self::Basic),
            other => Err(format!("Unknown server variant '{}', expected enhanced or basic", other)),
        }
    }
}

/// Model worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Try to use the model worker at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Worker base URL
    #[serde(default)]
    pub url: Option<String>,

    /// Request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Max simultaneous generations
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: None,
            timeout: default_timeout(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.max(1))
    }

    /// Worker URL when the model is enabled and configured
    pub fn endpoint(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// Temp storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for uploads and generated audio
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Model voice folder, relative to `temp_dir`
    #[serde(default = "default_voices_subdir")]
    pub voices_subdir: String,

    /// Request body limit (bytes)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            voices_subdir: default_voices_subdir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl StorageConfig {
    pub fn voices_dir(&self) -> PathBuf {
        self.temp_dir.join(&self.voices_subdir)
    }

    /// Upload limit in whole megabytes, for error messages
    pub fn max_upload_mb(&self) -> u64 {
        (self.max_upload_bytes / (1024 * 1024)) as u64
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable access log
    #[serde(default = "default_true")]
    pub access_log: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            access_log: true,
        }
    }
}

/// Default values
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    7860
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    300
}

fn default_max_concurrent() -> usize {
    4
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_voices_subdir() -> String {
    "tortoise_custom_voices".to_string()
}

fn default_max_upload_bytes() -> usize {
    100 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ServerConfig {
    /// Load from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Save to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Apply `TORTOISE_*` overrides from the process environment
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup
    pub fn apply_env_from<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("TORTOISE_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("TORTOISE_PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid TORTOISE_PORT '{}': {}", port, e))?;
        }
        if let Some(url) = lookup("TORTOISE_MODEL_URL") {
            self.model.url = Some(url);
        }
        if let Some(variant) = lookup("TORTOISE_VARIANT") {
            self.variant = variant.parse().map_err(anyhow::Error::msg)?;
        }
        Ok(())
    }

    /// Preset used when a request names none
    pub fn default_quality(&self) -> Quality {
        match self.variant {
            ServerVariant::Enhanced => Quality::UltraFast,
            ServerVariant::Basic => Quality::Standard,
        }
    }

    /// Whether model failures degrade to placeholder audio
    pub fn simulation_fallback(&self) -> bool {
        self.variant == ServerVariant::Enhanced
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            variant: ServerVariant::default(),
            model: ModelConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:7860");
        assert_eq!(config.variant, ServerVariant::Enhanced);
        assert_eq!(config.storage.max_upload_mb(), 100);
        assert_eq!(config.model.max_concurrent, 4);
        assert!(config.storage.voices_dir().ends_with("tortoise_custom_voices"));
        assert!(config.model.endpoint().is_none());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "port: 9000\nvariant: basic\nmodel:\n  url: http://localhost:8001\n";
        let config: ServerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.default_quality(), Quality::Standard);
        assert!(!config.simulation_fallback());
        assert_eq!(config.model.endpoint(), Some("http://localhost:8001"));
    }

    #[test]
    fn test_disabled_model_has_no_endpoint() {
        let mut config = ServerConfig::default();
        config.model.url = Some("http://localhost:8001".to_string());
        config.model.enabled = false;
        assert!(config.model.endpoint().is_none());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TORTOISE_PORT", "7999"),
            ("TORTOISE_VARIANT", "BASIC"),
            ("TORTOISE_MODEL_URL", "http://gpu:9000"),
        ]
        .into_iter()
        .collect();

        let mut config = ServerConfig::default();
        config
            .apply_env_from(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.port, 7999);
        assert_eq!(config.variant, ServerVariant::Basic);
        assert_eq!(config.model.url.as_deref(), Some("http://gpu:9000"));

        let mut bad = ServerConfig::default();
        assert!(bad
            .apply_env_from(|k| (k == "TORTOISE_PORT").then(|| "eighty".to_string()))
            .is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.yaml");
        let mut config = ServerConfig::default();
        config.variant = ServerVariant::Basic;
        config.save(&path).unwrap();

        let loaded = ServerConfig::load(&path).unwrap();
        assert_eq!(loaded.variant, ServerVariant::Basic);
        assert_eq!(loaded.port, 7860);
    }
}
