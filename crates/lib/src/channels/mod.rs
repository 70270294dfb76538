//! Chat session side of the bridge (e.g. Telegram).
//!
//! [`ChatSession`] is what the session role drives: it emits received messages
//! and sends replies and relayed messages back into the chat.

mod inbound;
mod session;
mod telegram;

pub use inbound::{GroupIdentity, MessageRef, RawMessage};
pub use session::ChatSession;
pub use telegram::{telegram_api_base, TelegramChannel};
