//! Inbound dispatcher: filters chat events by group, parses commands, calls the backend
//! and replies in the chat.
//!
//! Events are handled one at a time, in arrival order; the reply for one event is sent
//! before the next event is looked at.

use crate::backend::{BackendClient, GatewayError};
use crate::channels::{ChatSession, GroupIdentity, RawMessage};
use crate::commands::{self, ParseError};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;

pub const INVALID_DATA_REPLY: &str = "Invalid data.";
pub const UNEXPECTED_FAILURE_REPLY: &str = "Something went wrong while processing the command.";

/// What happened to one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Foreign group or plain chat text: nothing sent, backend untouched.
    Ignored,
    /// A reply with this text was sent (or attempted) to the originating chat.
    Replied(String),
}

pub struct Dispatcher {
    group: GroupIdentity,
    backend: BackendClient,
    session: Arc<dyn ChatSession>,
}

impl Dispatcher {
    pub fn new(group: GroupIdentity, backend: BackendClient, session: Arc<dyn ChatSession>) -> Self {
        Self {
            group,
            backend,
            session,
        }
    }

    /// Consume events until the session stops delivering them.
    pub async fn run(&self, mut events: mpsc::Receiver<RawMessage>) {
        while let Some(msg) = events.recv().await {
            self.handle(msg).await;
        }
        log::info!("dispatcher: event stream closed");
    }

    /// Handle one event. A panic while handling it becomes a generic reply; it never stops the loop.
    pub async fn handle(&self, msg: RawMessage) -> Disposition {
        match AssertUnwindSafe(self.process(&msg)).catch_unwind().await {
            Ok(disposition) => disposition,
            Err(_) => {
                log::error!(
                    "dispatcher: unexpected failure handling message from {}",
                    msg.origin_id()
                );
                self.send_reply(&msg, UNEXPECTED_FAILURE_REPLY).await
            }
        }
    }

    async fn process(&self, msg: &RawMessage) -> Disposition {
        if msg.is_from_foreign_group(&self.group) {
            log::debug!("dispatcher: ignoring message from group {}", msg.origin_id());
            return Disposition::Ignored;
        }
        let command = match commands::parse(&msg.text) {
            Ok(command) => command,
            Err(ParseError::NotACommand) => return Disposition::Ignored,
            Err(ParseError::InvalidArguments) => {
                return self.send_reply(msg, INVALID_DATA_REPLY).await;
            }
        };
        log::debug!("dispatcher: running `{}`", command);
        let reply = match self.backend.dispatch(&command).await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("dispatcher: `{}` failed: {}", command, e);
                failure_reply(&e)
            }
        };
        self.send_reply(msg, &reply).await
    }

    async fn send_reply(&self, msg: &RawMessage, text: &str) -> Disposition {
        if let Err(e) = self.session.reply(&msg.reference, text).await {
            log::warn!("dispatcher: reply to {} failed: {}", msg.origin_id(), e);
        }
        Disposition::Replied(text.to_string())
    }
}

/// User-visible diagnostic for a failed backend call: names the error kind and its detail.
pub fn failure_reply(err: &GatewayError) -> String {
    format!("Error ({}): {}", err.kind(), err.detail())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::MessageRef;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::task::JoinHandle;

    const GROUP: &str = "-1001";

    /// Records replies; optionally panics on the first reply to exercise the catch boundary.
    #[derive(Default)]
    struct RecordingSession {
        replies: Mutex<Vec<(MessageRef, String)>>,
        panic_once: Mutex<bool>,
    }

    #[async_trait]
    impl ChatSession for RecordingSession {
        fn id(&self) -> &str {
            "recording"
        }

        fn start(self: Arc<Self>, _events: mpsc::Sender<RawMessage>) -> JoinHandle<()> {
            tokio::spawn(async {})
        }

        fn stop(&self) {}

        async fn find_group(&self, _name: &str) -> Result<Option<String>, String> {
            Ok(None)
        }

        async fn send_message(&self, _group: &GroupIdentity, _text: &str) -> Result<(), String> {
            Ok(())
        }

        async fn reply(&self, original: &MessageRef, text: &str) -> Result<(), String> {
            let should_panic = std::mem::take(&mut *self.panic_once.lock().unwrap());
            if should_panic {
                panic!("reply exploded");
            }
            self.replies
                .lock()
                .unwrap()
                .push((original.clone(), text.to_string()));
            Ok(())
        }
    }

    fn message(origin: &str, is_group: bool, text: &str) -> RawMessage {
        RawMessage {
            text: text.to_string(),
            is_group_message: is_group,
            reference: MessageRef {
                origin_id: origin.to_string(),
                message_id: "5".to_string(),
            },
        }
    }

    fn dispatcher(server: &mockito::Server, session: Arc<RecordingSession>) -> Dispatcher {
        let backend = BackendClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        Dispatcher::new(GroupIdentity::new(GROUP), backend, session)
    }

    #[tokio::test]
    async fn foreign_group_makes_no_call_and_no_reply() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/get-tickers")
            .expect(0)
            .create_async()
            .await;
        let session = Arc::new(RecordingSession::default());
        let d = dispatcher(&server, session.clone());

        let out = d.handle(message("-2002", true, "!get")).await;
        assert_eq!(out, Disposition::Ignored);
        assert!(session.replies.lock().unwrap().is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn plain_text_is_ignored() {
        let server = mockito::Server::new_async().await;
        let session = Arc::new(RecordingSession::default());
        let d = dispatcher(&server, session.clone());

        assert_eq!(
            d.handle(message(GROUP, true, "good morning")).await,
            Disposition::Ignored
        );
        assert!(session.replies.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_arguments_reply_without_backend_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/news")
            .expect(0)
            .create_async()
            .await;
        let session = Arc::new(RecordingSession::default());
        let d = dispatcher(&server, session.clone());

        let out = d.handle(message(GROUP, true, "!news AAPL notaurl")).await;
        assert_eq!(out, Disposition::Replied(INVALID_DATA_REPLY.to_string()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn success_replies_to_original_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/get-tickers")
            .with_status(200)
            .with_body(r#"["AAPL","TSLA"]"#)
            .create_async()
            .await;
        let session = Arc::new(RecordingSession::default());
        let d = dispatcher(&server, session.clone());

        d.handle(message(GROUP, true, "!get")).await;
        let replies = session.replies.lock().unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].0.origin_id, GROUP);
        assert_eq!(replies[0].0.message_id, "5");
        assert_eq!(replies[0].1, "Tickers in watchlist: AAPL, TSLA");
    }

    #[tokio::test]
    async fn direct_chat_is_served() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/clear-news")
            .with_status(200)
            .create_async()
            .await;
        let session = Arc::new(RecordingSession::default());
        let d = dispatcher(&server, session.clone());

        let out = d.handle(message("42", false, "!clear-news")).await;
        assert_eq!(out, Disposition::Replied("News cleared.".to_string()));
    }

    #[tokio::test]
    async fn backend_rejection_reply_names_kind_and_detail() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/add-ticker")
            .with_status(400)
            .with_body(r#"{"error":"bad ticker"}"#)
            .create_async()
            .await;
        let session = Arc::new(RecordingSession::default());
        let d = dispatcher(&server, session.clone());

        let out = d.handle(message(GROUP, true, "!add ???")).await;
        assert_eq!(
            out,
            Disposition::Replied("Error (BackendRejected): bad ticker".to_string())
        );
    }

    #[tokio::test]
    async fn panic_becomes_generic_reply_and_loop_continues() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/clear-news")
            .with_status(200)
            .expect(2)
            .create_async()
            .await;
        let session = Arc::new(RecordingSession::default());
        *session.panic_once.lock().unwrap() = true;
        let d = dispatcher(&server, session.clone());

        let (tx, rx) = mpsc::channel(4);
        tx.send(message(GROUP, true, "!clear-news")).await.unwrap();
        tx.send(message(GROUP, true, "!clear-news")).await.unwrap();
        drop(tx);
        d.run(rx).await;

        let replies = session.replies.lock().unwrap();
        let texts: Vec<&str> = replies.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, vec![UNEXPECTED_FAILURE_REPLY, "News cleared."]);
    }

    #[test]
    fn failure_reply_for_unavailable() {
        let err = GatewayError::BackendUnavailable("unexpected status 503".to_string());
        assert_eq!(
            failure_reply(&err),
            "Error (BackendUnavailable): unexpected status 503"
        );
    }
}
