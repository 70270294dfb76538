//! Telegram chat session: long-poll getUpdates for inbound messages, sendMessage for replies and relay sends.

use crate::channels::inbound::{GroupIdentity, MessageRef, RawMessage};
use crate::channels::session::ChatSession;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const LONG_POLL_TIMEOUT: u64 = 30;

#[derive(Debug, Deserialize)]
struct GetUpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<TelegramUpdate>,
}

/// Telegram update payload (getUpdates result item).
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub chat: TelegramChat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    /// "private", "group", "supergroup" or "channel".
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl TelegramChat {
    fn is_group(&self) -> bool {
        self.kind == "group" || self.kind == "supergroup"
    }
}

impl TelegramMessage {
    /// Text messages become inbound events; everything else (stickers, joins, ...) is skipped.
    fn to_raw_message(&self) -> Option<RawMessage> {
        let text = self.text.as_ref()?;
        Some(RawMessage {
            text: text.clone(),
            is_group_message: self.chat.is_group(),
            reference: MessageRef {
                origin_id: self.chat.id.to_string(),
                message_id: self.message_id.to_string(),
            },
        })
    }
}

/// Telegram chat session backed by the Bot API.
pub struct TelegramChannel {
    id: String,
    token: Option<String>,
    api_base: String,
    running: AtomicBool,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(token: Option<String>) -> Self {
        Self::with_api_base(token, telegram_api_base())
    }

    /// Same as [`TelegramChannel::new`] but against a custom Bot API endpoint.
    pub fn with_api_base(token: Option<String>, api_base: impl Into<String>) -> Self {
        Self {
            id: "telegram".to_string(),
            token,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            running: AtomicBool::new(false),
            client: reqwest::Client::new(),
        }
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn method_url(&self, method: &str) -> Result<String, String> {
        let token = self
            .token
            .as_ref()
            .ok_or("telegram bot token not configured")?;
        Ok(format!("{}/bot{}/{}", self.api_base, token, method))
    }

    /// Call Telegram getUpdates. Returns (updates, next_offset).
    async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: u64,
    ) -> Result<(Vec<TelegramUpdate>, Option<i64>), String> {
        let url = format!("{}?timeout={}", self.method_url("getUpdates")?, timeout);
        let url = if let Some(off) = offset {
            format!("{}&offset={}", url, off)
        } else {
            url
        };
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("getUpdates failed: {} {}", status, body));
        }
        let data: GetUpdatesResponse = res.json().await.map_err(|e| e.to_string())?;
        if !data.ok {
            return Err("getUpdates returned ok: false".to_string());
        }
        let next_offset = data
            .result
            .iter()
            .map(|u| u.update_id)
            .max()
            .map(|id| id + 1);
        Ok((data.result, next_offset))
    }

    async fn post_send_message(&self, body: serde_json::Value) -> Result<(), String> {
        let url = self.method_url("sendMessage")?;
        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("sendMessage failed: {} {}", status, body));
        }
        Ok(())
    }
}

async fn run_get_updates_loop(channel: Arc<TelegramChannel>, events: mpsc::Sender<RawMessage>) {
    let mut offset: Option<i64> = None;
    while channel.running() {
        match channel.get_updates(offset, LONG_POLL_TIMEOUT).await {
            Ok((updates, next)) => {
                offset = next.or(offset);
                for raw in updates
                    .iter()
                    .filter_map(|u| u.message.as_ref())
                    .filter_map(TelegramMessage::to_raw_message)
                {
                    if events.send(raw).await.is_err() {
                        log::debug!("telegram: event channel closed, stopping loop");
                        return;
                    }
                }
            }
            Err(e) => {
                log::debug!("telegram getUpdates error: {}", e);
                tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;
            }
        }
    }
    log::info!("telegram channel: getUpdates loop stopped");
}

#[async_trait]
impl ChatSession for TelegramChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn start(self: Arc<Self>, events: mpsc::Sender<RawMessage>) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        log::info!("telegram channel: starting getUpdates long-poll loop");
        tokio::spawn(run_get_updates_loop(self, events))
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// The Bot API cannot list chats, so this scans the pending (unconfirmed) updates for a group with that title.
    async fn find_group(&self, name: &str) -> Result<Option<String>, String> {
        let (updates, _) = self.get_updates(None, 0).await?;
        Ok(updates
            .iter()
            .filter_map(|u| u.message.as_ref())
            .map(|m| &m.chat)
            .find(|c| c.is_group() && c.title.as_deref() == Some(name))
            .map(|c| c.id.to_string()))
    }

    async fn send_message(&self, group: &GroupIdentity, text: &str) -> Result<(), String> {
        self.post_send_message(serde_json::json!({ "chat_id": group.as_str(), "text": text }))
            .await
    }

    async fn reply(&self, original: &MessageRef, text: &str) -> Result<(), String> {
        let mut body = serde_json::json!({ "chat_id": original.origin_id, "text": text });
        if let Ok(message_id) = original.message_id.parse::<i64>() {
            body["reply_parameters"] = serde_json::json!({ "message_id": message_id });
        }
        self.post_send_message(body).await
    }
}

/// Resolve Telegram bot API base URL (for tests or custom endpoints).
pub fn telegram_api_base() -> String {
    std::env::var("TELEGRAM_API_BASE").unwrap_or_else(|_| TELEGRAM_API_BASE.to_string())
}
