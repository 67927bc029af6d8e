//! http-remote: HTTP implementation of the `RemoteBackend` port.
//!
//! Purpose
//! - Fetch static snapshot resources (`GET <base>/<resource>`) used to seed an
//!   empty local collection.
//! - Mirror writes to server endpoints (`POST <base>/<endpoint>` with a JSON body).
//!
//! API
//! - `HttpRemote::new(base_url)` / `HttpRemote::from_env()`
//!
//! Notes
//! - One attempt per call, no retry. A request timeout (default 10 s) bounds
//!   every call so a hung server cannot stall a load.
//! - Any non-2xx status or a body that is not a JSON array of objects maps to
//!   a `RemoteError`; callers treat all of them as "no data available".

use std::time::Duration;

use async_trait::async_trait;
use domain::{Record, RemoteBackend, RemoteError};
use serde_json::Value;
use tracing::trace;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Remote backend reached over HTTP.
#[derive(Clone, Debug)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemote {
    pub fn new<S: Into<String>>(base_url: S) -> Result<Self, RemoteError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Every request is bounded by `timeout`; there is no unbounded mode.
    pub fn with_timeout<S: Into<String>>(
        base_url: S,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let base_url = base_url.into();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(RemoteError::NotConfigured(format!(
                "base url must start with http:// or https://: {base_url}"
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    /// Build from `REMOTE_BASE_URL` and `REMOTE_TIMEOUT_SECS`. Returns
    /// `Ok(None)` when no base url is configured.
    pub fn from_env() -> Result<Option<Self>, RemoteError> {
        let Some(base) = std::env::var("REMOTE_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
        else {
            return Ok(None);
        };
        let timeout = parse_timeout(std::env::var("REMOTE_TIMEOUT_SECS").ok().as_deref())?;
        Self::with_timeout(base, timeout).map(Some)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

// Unset means the default; zero is rejected so a hung peer can never stall a load.
fn parse_timeout(raw: Option<&str>) -> Result<Duration, RemoteError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(DEFAULT_TIMEOUT);
    };
    match raw.parse::<u64>() {
        Ok(0) => Err(RemoteError::NotConfigured(
            "REMOTE_TIMEOUT_SECS must be at least 1".into(),
        )),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => Err(RemoteError::NotConfigured(format!(
            "REMOTE_TIMEOUT_SECS is not a number: {raw}"
        ))),
    }
}

#[async_trait]
impl RemoteBackend for HttpRemote {
    async fn fetch_snapshot(&self, resource: &str) -> Result<Vec<Record>, RemoteError> {
        let url = self.url(resource);
        trace!(%url, "http-remote: fetching snapshot");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        serde_json::from_slice::<Vec<Record>>(&bytes).map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn push(&self, endpoint: &str, body: &Value) -> Result<(), RemoteError> {
        let url = self.url(endpoint);
        trace!(%url, "http-remote: mirroring write");
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }
        Ok(())
    }
}
