//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.newsrelay/config.json`) and environment.
//! Environment values (`BASE_URL`, `GROUP_ID`, `TELEGRAM_BOT_TOKEN`) override the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Relay HTTP listener settings.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Backend API settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// The authorized chat group.
    #[serde(default)]
    pub group: GroupConfig,

    /// Channel settings (e.g. Telegram).
    #[serde(default)]
    pub channels: ChannelsConfig,
}

/// Relay bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayConfig {
    /// Port for the relay HTTP listener (default 3000).
    #[serde(default = "default_relay_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_relay_bind")]
    pub bind: String,
}

fn default_relay_port() -> u16 {
    3000
}

fn default_relay_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: default_relay_port(),
            bind: default_relay_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// Backend base URL (e.g. "http://127.0.0.1:8000"). Overridden by BASE_URL env.
    pub base_url: Option<String>,

    /// Per-call timeout in seconds (default 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Authorized group: a fixed id, or a display name looked up through the chat session at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupConfig {
    /// Group id (e.g. Telegram chat id). Overridden by GROUP_ID env. Wins over `name`.
    pub id: Option<String>,
    /// Group display name, used when no id is set.
    pub name: Option<String>,
}

/// How the authorized group identity is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupSelector {
    Fixed(String),
    ByName(String),
}

/// Per-channel config (e.g. Telegram bot token).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default)]
    pub telegram: TelegramChannelConfig,
}

/// Telegram channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramChannelConfig {
    /// Bot token from BotFather. Overridden by TELEGRAM_BOT_TOKEN env when set.
    pub bot_token: Option<String>,
}

/// Non-blank env value, else the non-blank config value.
fn env_or(var: &str, fallback: Option<&String>) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            fallback
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve the backend base URL: env BASE_URL overrides config.
pub fn resolve_backend_base_url(config: &Config) -> Option<String> {
    env_or("BASE_URL", config.backend.base_url.as_ref())
}

/// Resolve the Telegram bot token: env TELEGRAM_BOT_TOKEN overrides config.
pub fn resolve_telegram_token(config: &Config) -> Option<String> {
    env_or("TELEGRAM_BOT_TOKEN", config.channels.telegram.bot_token.as_ref())
}

/// Resolve how to find the authorized group: env GROUP_ID, then group.id, then group.name.
pub fn resolve_group_selector(config: &Config) -> Result<GroupSelector> {
    group_selector(std::env::var("GROUP_ID").ok(), &config.group)
}

/// Pick the group selector from an optional id override and the group config.
/// A non-blank `id_override` wins, then `group.id`, then `group.name`.
pub fn group_selector(id_override: Option<String>, group: &GroupConfig) -> Result<GroupSelector> {
    let non_blank = |s: &String| {
        let t = s.trim();
        (!t.is_empty()).then(|| t.to_string())
    };
    if let Some(id) = id_override
        .as_ref()
        .and_then(non_blank)
        .or_else(|| group.id.as_ref().and_then(non_blank))
    {
        return Ok(GroupSelector::Fixed(id));
    }
    group
        .name
        .as_ref()
        .and_then(non_blank)
        .map(GroupSelector::ByName)
        .context("no authorized group configured (set group.id, group.name or GROUP_ID)")
}

/// Base URL of the relay listener (e.g. "http://127.0.0.1:3000"). IPv6 literals are bracketed.
pub fn relay_base_url(relay: &RelayConfig) -> String {
    let bind = relay.bind.trim();
    if bind.contains(':') && !bind.starts_with('[') {
        format!("http://[{}]:{}", bind, relay.port)
    } else {
        format!("http://{}:{}", bind, relay.port)
    }
}

/// True if the bind address is loopback (127.0.0.1, ::1, etc.).
pub fn is_loopback_bind(bind: &str) -> bool {
    let b = bind.trim();
    b == "127.0.0.1" || b == "::1" || b == "localhost"
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("NEWSRELAY_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".newsrelay").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path (or the default). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
