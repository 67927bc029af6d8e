use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::{Record, RemoteBackend, RemoteError};

/// In-process remote backend with fixed snapshots. Records every push and
/// counts snapshot fetches so tests can assert on remote traffic.
pub struct StaticRemote {
    snapshots: HashMap<String, Result<Vec<Record>, RemoteError>>,
    push_failure: Option<RemoteError>,
    hang_pushes: bool,
    fetches: Mutex<usize>,
    pushes: Mutex<Vec<(String, Value)>>,
}

impl StaticRemote {
    pub fn new() -> Self {
        Self {
            snapshots: HashMap::new(),
            push_failure: None,
            hang_pushes: false,
            fetches: Mutex::new(0),
            pushes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_snapshot<S: Into<String>>(mut self, resource: S, records: Vec<Record>) -> Self {
        self.snapshots.insert(resource.into(), Ok(records));
        self
    }

    /// Make fetches of `resource` fail with `err`.
    pub fn with_snapshot_error<S: Into<String>>(mut self, resource: S, err: RemoteError) -> Self {
        self.snapshots.insert(resource.into(), Err(err));
        self
    }

    /// Make every push fail with `err`.
    pub fn failing_pushes(mut self, err: RemoteError) -> Self {
        self.push_failure = Some(err);
        self
    }

    /// Make every push record its body and then never complete, like a peer
    /// that accepts the connection and stops answering.
    pub fn hanging_pushes(mut self) -> Self {
        self.hang_pushes = true;
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().map(|n| *n).unwrap_or(0)
    }

    pub fn pushes(&self) -> Vec<(String, Value)> {
        self.pushes.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Default for StaticRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteBackend for StaticRemote {
    async fn fetch_snapshot(&self, resource: &str) -> Result<Vec<Record>, RemoteError> {
        if let Ok(mut n) = self.fetches.lock() {
            *n += 1;
        }
        match self.snapshots.get(resource) {
            Some(result) => result.clone(),
            None => Err(RemoteError::Status(404)),
        }
    }

    async fn push(&self, endpoint: &str, body: &Value) -> Result<(), RemoteError> {
        if let Ok(mut p) = self.pushes.lock() {
            p.push((endpoint.to_string(), body.clone()));
        }
        if self.hang_pushes {
            std::future::pending::<()>().await;
        }
        match &self.push_failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
