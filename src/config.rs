use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model_api_key: String,
    #[serde(default)]
    pub video_api_key: String,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_player_command")]
    pub player_command: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_model_name() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_theme() -> String {
    "terminal-default".to_string()
}
fn default_player_command() -> String {
    "mpv".to_string()
}
fn default_data_dir() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mentor")
        .to_string_lossy()
        .to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_api_key: String::new(),
            video_api_key: String::new(),
            model_name: default_model_name(),
            theme: default_theme(),
            player_command: default_player_command(),
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mentor")
            .join("config.toml")
    }

    /// Environment variables win over the config file, so keys never have to
    /// be written to disk.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = env::var("MENTOR_MODEL_API_KEY") {
            if !key.is_empty() {
                self.model_api_key = key;
            }
        }
        if let Ok(key) = env::var("MENTOR_VIDEO_API_KEY") {
            if !key.is_empty() {
                self.video_api_key = key;
            }
        }
    }

    /// Both collaborators need credentials before the app is useful; fail
    /// fast at startup instead of erroring on the first message.
    pub fn require_credentials(&self) -> Result<()> {
        if self.model_api_key.is_empty() {
            bail!(
                "model API key is not configured; set MENTOR_MODEL_API_KEY or add \
                 model_api_key to {}",
                Self::config_path().display()
            );
        }
        if self.video_api_key.is_empty() {
            bail!(
                "video API key is not configured; set MENTOR_VIDEO_API_KEY or add \
                 video_api_key to {}",
                Self::config_path().display()
            );
        }
        Ok(())
    }
}
