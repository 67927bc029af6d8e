//! Domain library for the booking and purchase-order record stores.
//!
//! Holds the record model, the collection configuration, the ports (traits)
//! for local storage and the remote backend, and the error definitions. Keep
//! concrete IO (SQLite, HTTP) out of this crate; those live in the adapters.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field every record is expected to carry; mutated by status updates.
pub const STATUS_FIELD: &str = "status";

/// One booking or order entry: an opaque JSON object.
///
/// The identifying field and `status` are expected but not validated. Field
/// order is preserved as parsed (serde_json `preserve_order`), so a stored
/// collection keeps the layout the remote sent; fields are never removed by
/// the store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build a record from an arbitrary JSON value; only objects are accepted.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(CoreError::Corrupt(format!(
                "record must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Builder-style field setter.
    pub fn with<K: Into<String>, V: Into<Value>>(mut self, field: K, value: V) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Value of the identifying field when it is a JSON string.
    pub fn id(&self, id_field: &str) -> Option<&str> {
        self.0.get(id_field).and_then(Value::as_str)
    }

    /// Exact match on the identifying field; no trimming or case folding.
    pub fn matches_id(&self, id_field: &str, id: &str) -> bool {
        self.id(id_field) == Some(id)
    }

    pub fn status(&self) -> Option<&str> {
        self.0.get(STATUS_FIELD).and_then(Value::as_str)
    }

    pub fn set_status<S: Into<String>>(&mut self, status: S) {
        self.0
            .insert(STATUS_FIELD.to_string(), Value::String(status.into()));
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Remote endpoints a collection mirrors its writes to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MirrorEndpoints {
    /// Receives a newly appended record as the JSON body.
    pub append: String,
    /// Receives `{<id_field>, status, <name>: [collection]}` after a status change.
    pub update_status: String,
}

/// Names and resources of one record collection.
///
/// Each store instance gets its own configuration, so tests and apps can run
/// several independent stores side by side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionConfig {
    /// Logical name; also the key of the full collection in status mirror bodies.
    pub name: String,
    /// Key in the local key space holding the serialized array.
    pub storage_key: String,
    /// Identifying field of each record.
    pub id_field: String,
    /// Capitalized noun used in outcome messages.
    pub label: String,
    /// Remote snapshot resource used to seed an empty local collection.
    pub snapshot: Option<String>,
    pub mirror: Option<MirrorEndpoints>,
}

impl CollectionConfig {
    /// Car bookings: seeded from a static snapshot, never mirrored.
    pub fn bookings() -> Self {
        Self {
            name: "bookings".into(),
            storage_key: "bookings".into(),
            id_field: "bookingId".into(),
            label: "Booking".into(),
            snapshot: Some("data/bookings.json".into()),
            mirror: None,
        }
    }

    /// Purchase orders: seeded from a static snapshot and mirrored to the server.
    pub fn orders() -> Self {
        Self {
            name: "orders".into(),
            storage_key: "purchaseOrders".into(),
            id_field: "orderId".into(),
            label: "Order".into(),
            snapshot: Some("data/purchase-orders.json".into()),
            mirror: Some(MirrorEndpoints {
                append: "api/save-order".into(),
                update_status: "api/update-order".into(),
            }),
        }
    }

    pub fn with_storage_key<S: Into<String>>(mut self, key: S) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_snapshot(mut self, resource: Option<String>) -> Self {
        self.snapshot = resource;
        self
    }

    pub fn with_mirror(mut self, mirror: Option<MirrorEndpoints>) -> Self {
        self.mirror = mirror;
        self
    }
}

/// What happened to the remote mirror of a write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorStatus {
    /// The collection has no mirror endpoints or no remote backend.
    NotConfigured,
    /// Handed to a background task; the outcome is only logged.
    Dispatched,
    /// Awaited and accepted by the remote.
    Confirmed,
    /// Awaited (or not dispatchable) and failed; local state stays authoritative.
    Failed,
}

/// Why a write reported failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Local storage is missing, unreadable or rejected the write.
    Storage,
    /// No record carries the requested id.
    NotFound,
}

/// Result descriptor returned by every write operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StoreOutcome {
    pub success: bool,
    pub message: String,
    pub remote: MirrorStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl StoreOutcome {
    pub fn success<S: Into<String>>(message: S, remote: MirrorStatus) -> Self {
        Self {
            success: true,
            message: message.into(),
            remote,
            failure: None,
        }
    }

    pub fn failure<S: Into<String>>(message: S) -> Self {
        Self::failed(message, FailureKind::Storage)
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::failed(message, FailureKind::NotFound)
    }

    fn failed<S: Into<String>>(message: S, kind: FailureKind) -> Self {
        Self {
            success: false,
            message: message.into(),
            remote: MirrorStatus::NotConfigured,
            failure: Some(kind),
        }
    }
}

/// Local persistent key space (the browser `localStorage` analogue).
///
/// Calls are synchronous. An implementation that does not exist in the
/// current environment reports `is_available() == false`.
pub trait LocalStorage: Send + Sync {
    fn is_available(&self) -> bool {
        true
    }
    fn get_item(&self, key: &str) -> Result<Option<String>, CoreError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), CoreError>;
}

impl<T: LocalStorage + ?Sized> LocalStorage for Arc<T> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, CoreError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), CoreError> {
        (**self).set_item(key, value)
    }
}

/// Remote source of truth: read-only snapshots and best-effort write mirrors.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Fetch a snapshot resource expected to hold a JSON array of records.
    async fn fetch_snapshot(&self, resource: &str) -> Result<Vec<Record>, RemoteError>;
    /// Post a JSON body to a mirror endpoint.
    async fn push(&self, endpoint: &str, body: &Value) -> Result<(), RemoteError>;
}

/// Core domain errors. Store operations log these instead of returning them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("local storage is unavailable in this environment")]
    StorageUnavailable,
    #[error("storage error: {0}")]
    Storage(String),
    #[error("stored value is corrupt: {0}")]
    Corrupt(String),
    #[error("not found")]
    NotFound,
}

/// Failures talking to the remote backend; never fatal for the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),
    #[error("remote answered with status {0}")]
    Status(u16),
    #[error("malformed remote body: {0}")]
    Decode(String),
    #[error("remote resource not configured: {0}")]
    NotConfigured(String),
}

/// Return a short about/version line for the binaries to print.
pub fn about() -> String {
    let pkg = env!("CARGO_PKG_NAME");
    let ver = env!("CARGO_PKG_VERSION");
    format!("{} v{} - record store library loaded", pkg, ver)
}

pub mod adapters;
pub mod catalog;
pub mod store;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_from_value_requires_object() {
        let rec = Record::from_value(json!({"orderId": "O-1", "status": "pending"})).unwrap();
        assert_eq!(rec.id("orderId"), Some("O-1"));
        assert_eq!(rec.status(), Some("pending"));

        let err = Record::from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, CoreError::Corrupt(_)));
    }

    #[test]
    fn matches_id_is_exact() {
        let rec = Record::new().with("bookingId", "BK-7");
        assert!(rec.matches_id("bookingId", "BK-7"));
        assert!(!rec.matches_id("bookingId", "bk-7"));
        assert!(!rec.matches_id("bookingId", " BK-7"));

        // numeric ids never equal a string id
        let numeric = Record::new().with("bookingId", 7);
        assert!(!numeric.matches_id("bookingId", "7"));
    }

    #[test]
    fn set_status_keeps_other_fields() {
        let mut rec = Record::new()
            .with("orderId", "O-2")
            .with("status", "pending")
            .with("total", 300);
        rec.set_status("confirmed");
        assert_eq!(rec.status(), Some("confirmed"));
        assert_eq!(rec.get("total"), Some(&json!(300)));
        assert_eq!(rec.fields().len(), 3);
    }

    #[test]
    fn record_serializes_as_plain_object() {
        let rec = Record::new().with("bookingId", "B1");
        assert_eq!(serde_json::to_string(&rec).unwrap(), r#"{"bookingId":"B1"}"#);
        let back: Record = serde_json::from_str(r#"{"bookingId":"B1"}"#).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn default_collections() {
        let b = CollectionConfig::bookings();
        assert_eq!(b.storage_key, "bookings");
        assert_eq!(b.id_field, "bookingId");
        assert!(b.mirror.is_none());

        let o = CollectionConfig::orders();
        assert_eq!(o.storage_key, "purchaseOrders");
        assert_eq!(o.id_field, "orderId");
        assert_eq!(o.snapshot.as_deref(), Some("data/purchase-orders.json"));
        assert!(o.mirror.is_some());
    }
}
