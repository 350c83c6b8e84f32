use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub provider: ProviderConfig,
    /// Models to compare, in column order. Each entry becomes one UI slot.
    pub models: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Where the .pairlens session directory lives (default: inside the
    /// working directory)
    pub path: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProviderConfig {
    #[serde(rename = "ollama")]
    Ollama { url: String },
    #[serde(rename = "none")]
    None,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig { path: None },
            provider: ProviderConfig::Ollama {
                url: "http://localhost:11434".to_string(),
            },
            models: vec!["nomic-embed-text".to_string()],
        }
    }
}

impl Config {
    /// Load config from a .pairlens/config.toml file, falling back to defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let config_path = root.join(".pairlens").join("config.toml");
        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("reading config from {}", config_path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("parsing config from {}", config_path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the actual storage directory path.
    pub fn storage_dir(&self, root: &Path) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| root.join(".pairlens"))
    }

    /// Write current config to disk (for `pairlens init`).
    pub fn save(&self, root: &Path) -> Result<()> {
        let dir = self.storage_dir(root);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating storage dir {}", dir.display()))?;
        let config_path = dir.join("config.toml");
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, contents)
            .with_context(|| format!("writing config to {}", config_path.display()))?;
        Ok(())
    }
}
