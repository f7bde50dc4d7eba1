use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    api: ApiConfig,
    #[serde(default)]
    remote: RemoteConfig,
    storage: StorageConfig,
    #[serde(default)]
    model: ModelConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiConfig {
    provider: String,
    key: String,
    #[serde(default)]
    url: String,
    model: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RemoteConfig {
    #[serde(default)]
    url: String,
    #[serde(default)]
    key: String,
    #[serde(default)]
    session_token: String,
}

#[derive(Debug, Clone, Deserialize)]
struct StorageConfig {
    data_dir: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ModelConfig {
    #[serde(default)]
    disable_reasoning: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_provider: String,
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub remote_url: String,
    pub remote_key: String,
    pub session_token: String,
    pub data_dir: PathBuf,
    pub disable_reasoning: bool,
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config_file: ConfigFile =
            toml::from_str(&content).context("Failed to parse config file")?;

        Ok(Self {
            api_provider: config_file.api.provider,
            api_key: config_file.api.key,
            api_url: config_file.api.url,
            model: config_file.api.model,
            remote_url: config_file.remote.url,
            remote_key: config_file.remote.key,
            session_token: config_file.remote.session_token,
            data_dir: config_file.storage.data_dir.into(),
            disable_reasoning: config_file.model.disable_reasoning,
        })
    }

    pub fn load() -> Result<Self> {
        Self::from_file("config.toml")
    }
}
