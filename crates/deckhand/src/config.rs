use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::imagegen::{DEFAULT_ASPECT_RATIO, PipelineSettings};
use crate::navigation::DEFAULT_PASSWORD;

const FILENAME: &str = "config.yaml";
const APP_DIR: &str = "deckhand";
const STORAGE_DIR: &str = "storage";

pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";
pub const ASPECT_RATIOS: &[&str] = &["1:1", "16:9", "4:3", "3:4", "9:16"];

/// Environment variables consulted for the API key, in order.
const API_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_generation: Option<ImageGenConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat: Option<ChatConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authoring: Option<AuthoringConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageGenConfig {
    /// API key. If not set, falls back to GEMINI_API_KEY, then API_KEY.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthoringConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR).join(FILENAME))
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::anyhow!("No config found. Run `deckhand config show` to see defaults.")
            } else {
                anyhow::anyhow!("Failed to read config: {e}")
            }
        })?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                log::debug!("Using default config: {e}");
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        let contents = format!("# Deckhand configuration - https://github.com/mklab-se/deckhand\n{yaml}");
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "image_generation.api_key" => {
                self.image_generation
                    .get_or_insert_with(ImageGenConfig::default)
                    .api_key = Some(value.to_string());
            }
            "image_generation.model" => {
                if value.trim().is_empty() {
                    anyhow::bail!("Model name must not be empty.");
                }
                self.image_generation
                    .get_or_insert_with(ImageGenConfig::default)
                    .model = Some(value.to_string());
            }
            "image_generation.aspect_ratio" => {
                if !ASPECT_RATIOS.contains(&value) {
                    anyhow::bail!(
                        "Invalid aspect ratio: {value}. Must be one of {}.",
                        ASPECT_RATIOS.join(", ")
                    );
                }
                self.image_generation
                    .get_or_insert_with(ImageGenConfig::default)
                    .aspect_ratio = Some(value.to_string());
            }
            "chat.model" => {
                if value.trim().is_empty() {
                    anyhow::bail!("Model name must not be empty.");
                }
                self.chat.get_or_insert_with(ChatConfig::default).model = Some(value.to_string());
            }
            "chat.system_prompt" => {
                self.chat
                    .get_or_insert_with(ChatConfig::default)
                    .system_prompt = Some(value.to_string());
            }
            "authoring.password" => {
                if value.is_empty() {
                    anyhow::bail!("Authoring password must not be empty.");
                }
                self.authoring
                    .get_or_insert_with(AuthoringConfig::default)
                    .password = Some(value.to_string());
            }
            "storage.dir" => {
                self.storage.get_or_insert_with(StorageConfig::default).dir =
                    Some(PathBuf::from(value));
            }
            _ => anyhow::bail!(
                "Unknown config key: {key}. Valid keys: image_generation.api_key, \
                 image_generation.model, image_generation.aspect_ratio, chat.model, \
                 chat.system_prompt, authoring.password, storage.dir"
            ),
        }
        Ok(())
    }

    /// Resolve the API key from config or the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    fn resolve_api_key_with(&self, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        if let Some(key) = self.image_generation.as_ref().and_then(|g| g.api_key.as_ref()) {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }
        API_KEY_VARS
            .iter()
            .filter_map(|name| env(*name))
            .find(|key| !key.is_empty())
    }

    pub fn image_model(&self) -> &str {
        self.image_generation
            .as_ref()
            .and_then(|g| g.model.as_deref())
            .unwrap_or(DEFAULT_IMAGE_MODEL)
    }

    pub fn aspect_ratio(&self) -> &str {
        self.image_generation
            .as_ref()
            .and_then(|g| g.aspect_ratio.as_deref())
            .unwrap_or(DEFAULT_ASPECT_RATIO)
    }

    pub fn chat_model(&self) -> &str {
        self.chat
            .as_ref()
            .and_then(|c| c.model.as_deref())
            .unwrap_or(DEFAULT_CHAT_MODEL)
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.chat.as_ref().and_then(|c| c.system_prompt.as_deref())
    }

    pub fn password(&self) -> &str {
        self.authoring
            .as_ref()
            .and_then(|a| a.password.as_deref())
            .unwrap_or(DEFAULT_PASSWORD)
    }

    pub fn storage_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = self.storage.as_ref().and_then(|s| s.dir.clone()) {
            return Ok(dir);
        }
        dirs::data_dir()
            .map(|d| d.join(APP_DIR).join(STORAGE_DIR))
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            aspect_ratio: self.aspect_ratio().to_string(),
            ..PipelineSettings::default()
        }
    }
}
