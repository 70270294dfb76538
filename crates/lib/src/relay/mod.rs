//! Outbound relay: HTTP listener that forwards `POST /send-message` bodies to the chat session.
//!
//! The listener never touches the chat session itself. Each accepted message is handed to
//! the session role over a channel and acknowledged right away (fire-and-forget).

mod protocol;
mod server;

pub use protocol::{ErrorBody, RelayRequest, SendMessageBody, StatusBody};
pub use server::{router, run_listener, RelayError};
