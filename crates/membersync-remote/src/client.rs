//! Raw HTTP client for the downstream member API
//!
//! Wraps `reqwest::Client` with base URL construction, API-key auth, a fixed
//! request timeout, and retry with bounded exponential backoff.
//!
//! ## Retry policy
//!
//! Only responses with status >= 500 are retried: a 5xx implies transient
//! server trouble, while a 4xx is a request the client must not blindly
//! repeat (conflict, validation). Network errors and timeouts likewise
//! propagate immediately; the driver records them per record.
//!
//! Backoff schedule: `base * 2^attempt` (1s, 2s, 4s with the default base).

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

use membersync_core::domain::RemoteError;

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum retries for server errors
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default backoff base delay (doubled per attempt)
const DEFAULT_RETRY_BASE: Duration = Duration::from_millis(1000);

/// How much response body to keep in error details
const MAX_DETAIL_LEN: usize = 512;

/// Connection settings for [`RemoteClient`]
#[derive(Debug, Clone)]
pub struct RemoteClientConfig {
    /// Base URL of the downstream API (no trailing slash)
    pub base_url: String,
    /// Bearer API key; `None` sends unauthenticated requests
    pub api_key: Option<String>,
    /// Fixed per-request timeout
    pub timeout: Duration,
    /// Maximum retries on server errors
    pub max_retries: u32,
    /// Backoff base delay (tests shrink this; production keeps 1s)
    pub retry_base: Duration,
}

impl RemoteClientConfig {
    /// Creates a config with default timeout/retry settings
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base: DEFAULT_RETRY_BASE,
        }
    }

    /// Sets the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the maximum retries for server errors
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the backoff base delay
    pub fn with_retry_base(mut self, base: Duration) -> Self {
        self.retry_base = base;
        self
    }

    /// Sets the fixed request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// HTTP client for downstream member API calls
pub struct RemoteClient {
    /// The underlying HTTP client (carries the fixed timeout)
    client: Client,
    /// Base URL for API requests
    base_url: String,
    /// Bearer API key
    api_key: Option<String>,
    /// Maximum retries on server errors
    max_retries: u32,
    /// Backoff base delay
    retry_base: Duration,
}

impl RemoteClient {
    /// Creates a new client from the given config
    pub fn new(config: RemoteClientConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemoteError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url,
            api_key: config.api_key,
            max_retries: config.max_retries,
            retry_base: config.retry_base,
        })
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Performs a single request and returns `(status, body)` on 2xx.
    ///
    /// Any non-2xx response becomes `RemoteError::Status`; network-level
    /// failures map to `Network` or `Timeout`. Bodies that are not valid
    /// JSON come back as `Value::Null` (list endpoints go through the
    /// envelope parser, which fails loudly on its own).
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<(StatusCode, Value), RemoteError> {
        let url = format!("{}{}", self.base_url, path);

        let mut builder = self.client.request(method.clone(), &url);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        debug!(%method, %url, "Sending request");

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                RemoteError::Timeout
            } else {
                RemoteError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                RemoteError::Timeout
            } else {
                RemoteError::Network(format!("Failed to read response body: {}", e))
            }
        })?;

        if !status.is_success() {
            let mut details = text;
            details.truncate(MAX_DETAIL_LEN);
            return Err(RemoteError::Status {
                status: status.as_u16(),
                details,
            });
        }

        let value = serde_json::from_str(&text).unwrap_or(Value::Null);
        Ok((status, value))
    }

    /// Performs a request, retrying on server errors (status >= 500) with
    /// bounded exponential backoff. Everything else propagates immediately.
    pub async fn request_with_retry(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<(StatusCode, Value), RemoteError> {
        for attempt in 0..=self.max_retries {
            match self.request(method.clone(), path, body).await {
                Ok(result) => {
                    if attempt > 0 {
                        info!(path, attempt, "Request succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(err) if err.is_server_error() && attempt < self.max_retries => {
                    let delay = self.retry_base * 2u32.pow(attempt);
                    warn!(
                        path,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Server error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }

        // The loop always returns from its final iteration
        Err(RemoteError::Network(format!(
            "Retry loop exited unexpectedly for {}",
            path
        )))
    }
}
