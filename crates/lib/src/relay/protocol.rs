//! Relay wire types: the HTTP body accepted at `/send-message` and the payload handed to the session role.

use serde::{Deserialize, Serialize};

/// Body of `POST /send-message`: `{ "message": string }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendMessageBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// A validated outbound message, copied by value across the listener → session channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRequest {
    pub message: String,
}

impl SendMessageBody {
    /// The relay payload, or `None` when `message` is absent or blank.
    pub fn into_request(self) -> Option<RelayRequest> {
        // Whitespace-only text is rejected like a missing field; it is never posted into the group.
        self.message
            .filter(|m| !m.trim().is_empty())
            .map(|message| RelayRequest { message })
    }
}

/// Success body: `{ "status": string }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusBody {
    pub status: String,
}

/// Error body: `{ "error": string }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
