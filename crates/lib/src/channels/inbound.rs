//! Inbound chat event: one received message, handed to the dispatcher and then dropped.

use std::fmt;

/// Identity of the single authorized chat group. Resolved once at startup and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupIdentity(String);

impl GroupIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a received message lives, so a reply can be scoped to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    /// Chat the message was posted in (e.g. Telegram chat_id).
    pub origin_id: String,
    pub message_id: String,
}

/// A message received from the chat session.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub text: String,
    /// True when the message was posted in a group chat (as opposed to a direct chat).
    pub is_group_message: bool,
    pub reference: MessageRef,
}

impl RawMessage {
    pub fn origin_id(&self) -> &str {
        &self.reference.origin_id
    }

    /// True when the message comes from a group other than `group`. Direct chats are never foreign.
    pub fn is_from_foreign_group(&self, group: &GroupIdentity) -> bool {
        self.is_group_message && self.origin_id() != group.as_str()
    }
}
