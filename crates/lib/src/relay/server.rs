//! Relay HTTP listener (listener role).

use crate::config::{self, RelayConfig};
use crate::relay::protocol::{ErrorBody, RelayRequest, SendMessageBody, StatusBody};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::any::Any;
use std::future::Future;
use tokio::sync::mpsc;
use tower_http::catch_panic::CatchPanicLayer;

const QUEUED_STATUS: &str = "Message queued for group";

#[derive(Clone)]
struct RelayState {
    relay_tx: mpsc::Sender<RelayRequest>,
    port: u16,
}

/// Relay failures and the HTTP status each one maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// `message` absent, blank, or the body is not JSON. 400.
    #[error("Message is required")]
    MissingMessage,
    /// The session role is gone or its queue is full. 500.
    #[error("Failed to send message")]
    SendFailed,
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingMessage => StatusCode::BAD_REQUEST,
            RelayError::SendFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Build the relay router. Messages accepted by `POST /send-message` go to `relay_tx`.
pub fn router(relay_tx: mpsc::Sender<RelayRequest>, port: u16) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/send-message", post(send_message))
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(RelayState { relay_tx, port })
}

/// Run the listener role on `config.bind:config.port` until `shutdown` completes.
pub async fn run_listener(
    config: &RelayConfig,
    relay_tx: mpsc::Sender<RelayRequest>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let bind = config.bind.trim();
    if !config::is_loopback_bind(bind) {
        log::warn!(
            "relay bound to {} without authentication; anyone who can reach it can post into the group",
            bind
        );
    }
    let bind_addr = format!("{}:{}", bind, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("relay listening on {}", bind_addr);

    axum::serve(listener, router(relay_tx, config.port))
        .with_graceful_shutdown(shutdown)
        .await
        .context("relay listener exited")?;
    log::info!("relay stopped");
    Ok(())
}

/// POST /send-message: validate, hand the message to the session role, acknowledge without waiting for delivery.
async fn send_message(
    State(state): State<RelayState>,
    body: Bytes,
) -> Result<Json<StatusBody>, RelayError> {
    let request = serde_json::from_slice::<SendMessageBody>(&body)
        .unwrap_or_default()
        .into_request()
        .ok_or(RelayError::MissingMessage)?;
    state.relay_tx.try_send(request).map_err(|e| {
        log::warn!("relay: handoff to session role failed: {}", e);
        RelayError::SendFailed
    })?;
    Ok(Json(StatusBody {
        status: QUEUED_STATUS.to_string(),
    }))
}

/// GET / returns a simple health JSON.
async fn health_http(State(state): State<RelayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.port,
    }))
}

fn panic_response(_err: Box<dyn Any + Send + 'static>) -> Response {
    log::error!("relay: request handler panicked");
    RelayError::SendFailed.into_response()
}
