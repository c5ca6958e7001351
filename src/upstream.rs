//! Outbound HTTP plumbing shared by the resolver, the tag cache and the combo index.
//!
//! Every upstream call goes through the [`HttpFetch`] trait so the engine can
//! run against the real services ([`ReqwestFetch`]) or against canned
//! responses ([`CannedFetch`]) without touching the network.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Status and decoded body of one upstream response.
#[derive(Debug, Clone)]
pub struct JsonReply {
    /// HTTP status code
    pub status: u16,
    /// Decoded JSON body, `Value::Null` when the body was not JSON
    pub body: Value,
}

impl JsonReply {
    /// A 200 reply carrying `body`
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    /// A bodiless reply with the given status
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Value::Null,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Blocking JSON GET against an upstream service.
///
/// `Err` means the request never produced a usable response (connect
/// failure, timeout, or a 200 whose body could not be read). Non-200 statuses
/// are returned as `Ok` so callers can decide how to absorb them.
pub trait HttpFetch: Send + Sync {
    fn get_json(&self, url: &str) -> Result<JsonReply>;

    /// Same as [`HttpFetch::get_json`] but bounded by `timeout` instead of
    /// the client default. Used for large bulk downloads.
    fn get_json_within(&self, url: &str, timeout: Duration) -> Result<JsonReply> {
        let _ = timeout;
        self.get_json(url)
    }
}

/// Build `base` + `path` with properly encoded query parameters.
pub fn build_url(base: &str, path: &str, params: &[(&str, &str)]) -> Result<String> {
    let raw = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    let url = if params.is_empty() {
        reqwest::Url::parse(&raw)
    } else {
        reqwest::Url::parse_with_params(&raw, params)
    }
    .with_context(|| format!("Invalid upstream URL: {}", raw))?;
    Ok(url.to_string())
}

// ============================================================================
// Live client
// ============================================================================

/// [`HttpFetch`] backed by a blocking reqwest client.
pub struct ReqwestFetch {
    client: reqwest::blocking::Client,
}

impl ReqwestFetch {
    /// Create a client whose every request is bounded by `timeout`.
    ///
    /// Must be called outside of an async runtime context.
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("deck-analyzer/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl ReqwestFetch {
    fn send(&self, request: reqwest::blocking::RequestBuilder, url: &str) -> Result<JsonReply> {
        let resp = request
            .send()
            .with_context(|| format!("Request to {} failed", url))?;
        let status = resp.status().as_u16();

        // Error bodies are informational only; a 200 body must arrive intact.
        let body = if status == 200 {
            resp.json::<Value>()
                .with_context(|| format!("Failed to read response body from {}", url))?
        } else {
            resp.json::<Value>().unwrap_or(Value::Null)
        };
        Ok(JsonReply { status, body })
    }
}

impl HttpFetch for ReqwestFetch {
    fn get_json(&self, url: &str) -> Result<JsonReply> {
        self.send(self.client.get(url), url)
    }

    fn get_json_within(&self, url: &str, timeout: Duration) -> Result<JsonReply> {
        self.send(self.client.get(url).timeout(timeout), url)
    }
}

// ============================================================================
// Canned responses
// ============================================================================

/// In-memory [`HttpFetch`] that serves fixed replies by exact URL.
///
/// Unknown URLs answer 404. Every call is recorded so callers can check how
/// often an upstream would have been hit.
#[derive(Default)]
pub struct CannedFetch {
    routes: HashMap<String, Result<JsonReply, String>>,
    calls: Mutex<Vec<String>>,
}

impl CannedFetch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `reply` for `url`
    pub fn route(mut self, url: impl Into<String>, reply: JsonReply) -> Self {
        self.routes.insert(url.into(), Ok(reply));
        self
    }

    /// Fail requests to `url` at the transport level
    pub fn fail(mut self, url: impl Into<String>, message: impl Into<String>) -> Self {
        self.routes.insert(url.into(), Err(message.into()));
        self
    }

    /// Number of requests made to `url` so far
    pub fn calls_to(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }

    /// Number of requests made to any URL so far
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl HttpFetch for CannedFetch {
    fn get_json(&self, url: &str) -> Result<JsonReply> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());

        match self.routes.get(url) {
            Some(Ok(reply)) => Ok(reply.clone()),
            Some(Err(message)) => Err(anyhow::anyhow!("{}", message)),
            None => Ok(JsonReply::status(404)),
        }
    }
}
