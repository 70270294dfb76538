//! Chat session interface: the long-lived connection the bridge sends and receives through.

use crate::channels::inbound::{GroupIdentity, MessageRef, RawMessage};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A connected chat session. Owned by the session role; only shared between its own loops.
#[async_trait]
pub trait ChatSession: Send + Sync {
    /// Session id (e.g. "telegram").
    fn id(&self) -> &str;

    /// Start delivering received messages, in arrival order, to `events`.
    /// The returned task ends (dropping the sender) once the session is stopped.
    fn start(self: Arc<Self>, events: mpsc::Sender<RawMessage>) -> JoinHandle<()>;

    /// Stop event delivery.
    fn stop(&self);

    /// Look up a group id by its display name. `Ok(None)` when no such group is visible.
    async fn find_group(&self, name: &str) -> Result<Option<String>, String>;

    /// Send an unscoped text message into the group.
    async fn send_message(&self, group: &GroupIdentity, text: &str) -> Result<(), String>;

    /// Reply to a received message, in the chat it came from.
    async fn reply(&self, original: &MessageRef, text: &str) -> Result<(), String>;
}
