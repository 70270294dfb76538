//! Backend API client: one HTTP call per chat command.
//!
//! Maps each [`Command`] to its endpoint (`POST /news`, `POST /add-ticker`,
//! `POST /remove-ticker`, `GET /clear-news`, `GET /get-tickers`) and turns the
//! response into the text shown in the chat. No retries, no caching.

use crate::commands::Command;
use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_REJECTION: &str = "Request rejected by backend";
const NO_TICKERS: &str = "No tickers in watchlist.";

/// Client for the backend HTTP API.
#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Backend answered 400.
    #[error("backend rejected the request: {0}")]
    BackendRejected(String),
    /// Transport failure, timeout, unexpected status or unreadable body.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl GatewayError {
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::BackendRejected(_) => "BackendRejected",
            GatewayError::BackendUnavailable(_) => "BackendUnavailable",
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            GatewayError::BackendRejected(d) | GatewayError::BackendUnavailable(d) => d,
        }
    }
}

#[derive(Serialize)]
struct NewsRequest<'a> {
    ticker: &'a str,
    url: &'a str,
}

#[derive(Serialize)]
struct TickerRequest<'a> {
    ticker: &'a str,
}

impl BackendClient {
    /// Every call made by this client fails with [`GatewayError::BackendUnavailable`] once `timeout` expires.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building backend http client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Run one command against the backend; returns the reply text on success.
    pub async fn dispatch(&self, command: &Command) -> Result<String, GatewayError> {
        let request = match command {
            Command::News { ticker, url } => self
                .client
                .post(self.url("/news"))
                .json(&NewsRequest { ticker, url }),
            Command::AddTicker { ticker } => self
                .client
                .post(self.url("/add-ticker"))
                .json(&TickerRequest { ticker }),
            Command::RemoveTicker { ticker } => self
                .client
                .post(self.url("/remove-ticker"))
                .json(&TickerRequest { ticker }),
            Command::ClearNews => self.client.get(self.url("/clear-news")),
            Command::GetTickers => self.client.get(self.url("/get-tickers")),
        };
        let res = request
            .send()
            .await
            .map_err(|e| GatewayError::BackendUnavailable(e.to_string()))?;

        let status = res.status();
        if status == StatusCode::BAD_REQUEST {
            let body: serde_json::Value = res.json().await.unwrap_or_default();
            let detail = body
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or(DEFAULT_REJECTION);
            return Err(GatewayError::BackendRejected(detail.to_string()));
        }
        if status != StatusCode::OK {
            return Err(GatewayError::BackendUnavailable(format!(
                "unexpected status {}",
                status
            )));
        }

        match command {
            Command::News { ticker, .. } => {
                let body: serde_json::Value = res.json().await.unwrap_or_default();
                Ok(body
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("News for {} submitted.", ticker)))
            }
            Command::AddTicker { ticker } => Ok(format!("Ticker {} added to watchlist.", ticker)),
            Command::RemoveTicker { ticker } => {
                Ok(format!("Ticker {} removed from watchlist.", ticker))
            }
            Command::ClearNews => Ok("News cleared.".to_string()),
            Command::GetTickers => {
                let tickers: Vec<String> = res.json().await.map_err(|e| {
                    GatewayError::BackendUnavailable(format!("invalid tickers response: {}", e))
                })?;
                Ok(format_tickers(&tickers))
            }
        }
    }
}

fn format_tickers(tickers: &[String]) -> String {
    if tickers.is_empty() {
        NO_TICKERS.to_string()
    } else {
        format!("Tickers in watchlist: {}", tickers.join(", "))
    }
}
