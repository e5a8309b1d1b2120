use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{IntakeError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub intake: IntakeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeConfig {
    #[serde(default = "default_max_concurrent_assignments")]
    pub max_concurrent_assignments: usize,
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_concurrent_assignments: default_max_concurrent_assignments(),
            preview_chars: default_preview_chars(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent_assignments() -> usize {
    4
}

fn default_preview_chars() -> usize {
    200
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        // If file doesn't exist, return default config with warning
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| IntakeError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| IntakeError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| IntakeError::Config(format!("Failed to serialize config: {}", e)))?;

        write_config_file(path, &content).await?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let base_url = self.store.base_url.trim();
        if base_url.is_empty() {
            return Err(IntakeError::Config(
                "store.base_url cannot be empty".to_string(),
            ));
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(IntakeError::Config(format!(
                "Invalid store.base_url: '{}'. Must start with http:// or https://",
                base_url
            )));
        }

        if self.store.timeout_secs == 0 {
            return Err(IntakeError::Config(
                "store.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.store.timeout_secs > 300 {
            return Err(IntakeError::Config(
                "store.timeout_secs cannot exceed 300".to_string(),
            ));
        }

        if self.intake.max_concurrent_assignments == 0 {
            return Err(IntakeError::Config(
                "intake.max_concurrent_assignments must be at least 1".to_string(),
            ));
        }
        if self.intake.max_concurrent_assignments > 32 {
            return Err(IntakeError::Config(
                "intake.max_concurrent_assignments cannot exceed 32".to_string(),
            ));
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Default configuration as TOML, with a comment on every setting
    pub fn example_toml() -> String {
        let config = Self::default();
        format!(
            r#"# case-intake configuration

[store]
# Base URL of the case store API
base_url = "{base_url}"
# Per-request timeout in seconds (1-300)
timeout_secs = {timeout_secs}

[intake]
# Sagas run in parallel during auto-assign (1-32)
max_concurrent_assignments = {max_concurrent}
# Characters of the email body shown in inbox and review listings
preview_chars = {preview_chars}
"#,
            base_url = config.store.base_url,
            timeout_secs = config.store.timeout_secs,
            max_concurrent = config.intake.max_concurrent_assignments,
            preview_chars = config.intake.preview_chars,
        )
    }

    /// Create an example configuration file
    pub async fn create_example(path: &Path) -> Result<()> {
        write_config_file(path, &Self::example_toml()).await?;
        tracing::info!("Wrote example configuration to {:?}", path);
        Ok(())
    }
}

async fn write_config_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            IntakeError::Config(format!("Failed to create config directory: {}", e))
        })?;
    }

    tokio::fs::write(path, content)
        .await
        .map_err(|e| IntakeError::Config(format!("Failed to write config file: {}", e)))
}
