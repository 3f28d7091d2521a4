use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::services::llm::LlmConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config.yml";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Directory with the built browser bundle, served at `/` when set.
    pub static_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            static_dir: None,
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

impl Config {
    /// Reads `path`, falling back to defaults when the file does not exist.
    /// Credentials missing from the file are taken from the environment.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_yaml_ng::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            log::info!("{} not found, using defaults", path.display());
            Config::default()
        };
        config.llm.fill_from_env();
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = Config::load(dir.path().join("config.yml"))?;

        assert_eq!(config.server.bind, "127.0.0.1:3000");
        assert_eq!(config.llm.provider, "anthropic");
        Ok(())
    }

    #[test]
    fn test_partial_file_keeps_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.yml");
        fs::write(
            &path,
            "server:\n  bind: 0.0.0.0:8080\nllm:\n  provider: openai\n  openai:\n    api_key: sk-test\n    model: gpt-4o-mini\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.server.static_dir, None);
        assert_eq!(config.llm.provider, "openai");
        let openai = config.llm.openai.as_ref().unwrap();
        assert_eq!(openai.api_key.as_deref(), Some("sk-test"));
        Ok(())
    }

    #[test]
    fn test_save_and_reload() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.yml");

        let mut config = Config::default();
        config.server.static_dir = Some("dist".to_string());
        config.save(&path)?;

        let loaded = Config::load(&path)?;
        assert_eq!(loaded.server.static_dir.as_deref(), Some("dist"));
        Ok(())
    }

    #[test]
    fn test_invalid_yaml_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.yml");
        fs::write(&path, "server: [unterminated")?;

        assert!(Config::load(&path).is_err());
        Ok(())
    }
}
