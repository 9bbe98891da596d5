use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub twitter: TwitterConfig,
    pub watch: WatchConfig,
    #[serde(default = "default_keepalive_config")]
    pub keepalive: KeepaliveConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Destination chat for alerts: a numeric chat id or "@channelname".
    pub chat_id: String,
    /// Optional photo sent along with the /start welcome message,
    /// either an http(s) URL or a local file path.
    #[serde(default)]
    pub welcome_photo: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TwitterConfig {
    pub bearer_token: String,
    /// Account handles to poll; a leading "@" is accepted and stripped.
    pub usernames: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WatchConfig {
    /// Case-insensitive words or phrases; a tweet is forwarded when any
    /// of them occurs as a whole word in its text.
    pub keywords: Vec<String>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KeepaliveConfig {
    #[serde(default = "default_keepalive_port")]
    pub port: u16,
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_keepalive_port() -> u16 {
    8080
}

fn default_keepalive_config() -> KeepaliveConfig {
    KeepaliveConfig {
        port: default_keepalive_port(),
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }
}
