use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::api::normalize_base_url;

pub const DEFAULT_SERVER: &str = "http://localhost:3000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub url: String,
    pub added_at: DateTime<Utc>,
    pub last_ping: Option<DateTime<Utc>>,
    pub status: ServerStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Up,
    Down,
    Unknown,
}

/// Known servers keyed by normalized URL, plus the selected one
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub current_server: Option<String>,
    #[serde(default)]
    pub servers: HashMap<String, ServerInfo>,
}

impl ServerInfo {
    pub fn new(url: String) -> Self {
        Self {
            url,
            added_at: Utc::now(),
            last_ping: None,
            status: ServerStatus::Unknown,
        }
    }

    pub fn update_ping(&mut self, status: ServerStatus) {
        self.last_ping = Some(Utc::now());
        self.status = status;
    }
}

impl ServerConfig {
    /// Register `url` if needed and make it current; returns the normalized URL
    pub fn select(&mut self, url: &str) -> anyhow::Result<String> {
        let url = normalize_base_url(url)?;
        self.servers
            .entry(url.clone())
            .or_insert_with(|| ServerInfo::new(url.clone()));
        self.current_server = Some(url.clone());
        Ok(url)
    }

    /// Override from `--server`, else the selected server, else the default
    pub fn resolve(&self, override_url: Option<&str>) -> anyhow::Result<String> {
        let raw = override_url
            .or(self.current_server.as_deref())
            .unwrap_or(DEFAULT_SERVER);
        Ok(normalize_base_url(raw)?)
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("CARDTROOPER_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("cardtrooper")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn session_path() -> anyhow::Result<PathBuf> {
    Ok(get_config_dir()?.join("session.json"))
}

pub fn cache_path() -> anyhow::Result<PathBuf> {
    Ok(get_config_dir()?.join("cards.json"))
}

pub fn load_server_config() -> anyhow::Result<ServerConfig> {
    let server_file = get_config_dir()?.join("server.json");

    if !server_file.exists() {
        return Ok(ServerConfig::default());
    }

    let content = fs::read_to_string(server_file)?;
    let config: ServerConfig = serde_json::from_str(&content)?;
    Ok(config)
}

pub fn save_server_config(config: &ServerConfig) -> anyhow::Result<()> {
    let server_file = get_config_dir()?.join("server.json");

    let content = serde_json::to_string_pretty(config)?;
    fs::write(server_file, content)?;
    Ok(())
}

pub async fn ping_server(url: &str) -> ServerStatus {
    let client = reqwest::Client::new();
    let url = format!("{}/health", url);

    match client.get(&url).timeout(std::time::Duration::from_secs(5)).send().await {
        Ok(response) if response.status().is_success() => ServerStatus::Up,
        _ => ServerStatus::Down,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_normalizes_and_registers() {
        let mut config = ServerConfig::default();
        let url = config.select("localhost:4000/").unwrap();
        assert_eq!(url, "http://localhost:4000");
        assert_eq!(config.current_server.as_deref(), Some("http://localhost:4000"));
        assert_eq!(config.servers[&url].status, ServerStatus::Unknown);

        config.select("http://localhost:4000").unwrap();
        assert_eq!(config.servers.len(), 1);
    }

    #[test]
    fn resolve_prefers_override() {
        let mut config = ServerConfig::default();
        assert_eq!(config.resolve(None).unwrap(), DEFAULT_SERVER);

        config.select("https://wallet.example.com").unwrap();
        assert_eq!(config.resolve(None).unwrap(), "https://wallet.example.com");
        assert_eq!(config.resolve(Some("127.0.0.1:9000")).unwrap(), "http://127.0.0.1:9000");
    }
}
