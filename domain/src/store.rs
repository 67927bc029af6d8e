use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    CollectionConfig, CoreError, LocalStorage, MirrorStatus, Record, RemoteBackend, StoreOutcome,
    STATUS_FIELD,
};

/// How a write is mirrored to the remote backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MirrorPolicy {
    /// Spawn the mirror call on the current tokio runtime and return at once.
    #[default]
    Detached,
    /// Await the mirror call; its result only selects the outcome message.
    Await,
}

impl MirrorPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "detached" => Some(MirrorPolicy::Detached),
            "await" => Some(MirrorPolicy::Await),
            _ => None,
        }
    }
}

/// Outcome of one mirror call, published on the report channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MirrorReport {
    pub collection: String,
    pub endpoint: String,
    pub error: Option<String>,
}

impl MirrorReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Local-first store of one record collection.
///
/// The local key space is authoritative. The remote backend is consulted once
/// to seed an empty collection and receives best-effort mirrors of writes.
/// No operation returns an error: reads degrade to an empty collection and
/// writes resolve to a [`StoreOutcome`].
///
/// Every write is a full read-modify-write of the stored array without any
/// lock, so two writers racing on the same key lose one update.
pub struct RecordStore<S: LocalStorage> {
    storage: S,
    config: CollectionConfig,
    remote: Option<Arc<dyn RemoteBackend>>,
    policy: MirrorPolicy,
    reports: Option<mpsc::UnboundedSender<MirrorReport>>,
}

impl<S: LocalStorage> RecordStore<S> {
    pub fn new(storage: S, config: CollectionConfig) -> Self {
        Self {
            storage,
            config,
            remote: None,
            policy: MirrorPolicy::default(),
            reports: None,
        }
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteBackend>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_mirror_policy(mut self, policy: MirrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Subscribe to mirror outcomes. Replaces any earlier subscription.
    ///
    /// The channel is unbounded: a subscriber must keep draining it (or drop
    /// the receiver, which stops delivery) or reports accumulate for the life
    /// of the store.
    pub fn mirror_reports(&mut self) -> mpsc::UnboundedReceiver<MirrorReport> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.reports = Some(tx);
        rx
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Load the collection, seeding it from the remote snapshot when the local
    /// collection is empty. Returns an empty collection on any failure.
    pub async fn load(&self) -> Vec<Record> {
        match self.try_load().await {
            Ok(records) => records,
            Err(CoreError::StorageUnavailable) => {
                debug!(collection = %self.config.name, "local storage unavailable; empty collection");
                Vec::new()
            }
            Err(e) => {
                error!(collection = %self.config.name, err = %e, "error loading collection");
                Vec::new()
            }
        }
    }

    /// Read-all entry point for dashboards. Like [`load`](Self::load), but a
    /// corrupt stored value degrades to whatever objects can be salvaged.
    pub async fn list_all(&self) -> Vec<Record> {
        match self.try_load().await {
            Ok(records) => records,
            Err(CoreError::StorageUnavailable) => Vec::new(),
            Err(e) => {
                error!(collection = %self.config.name, err = %e, "error listing collection; falling back to raw local value");
                self.salvage_local()
            }
        }
    }

    /// Append `record` as the last element and persist the whole collection.
    pub async fn append(&self, record: Record) -> StoreOutcome {
        let label = &self.config.label;
        let failed = || StoreOutcome::failure(format!("Failed to save {}", label.to_lowercase()));

        let mut records = match self.read_local() {
            Ok(records) => records,
            Err(e) => {
                error!(collection = %self.config.name, err = %e, "error saving record");
                return failed();
            }
        };
        records.push(record.clone());
        if let Err(e) = self.write_local(&records) {
            error!(collection = %self.config.name, err = %e, "error saving record");
            return failed();
        }
        info!(collection = %self.config.name, id = ?record.id(&self.config.id_field), total = records.len(), "record saved");

        let remote = match self.config.mirror.as_ref() {
            Some(endpoints) => {
                self.mirror(endpoints.append.clone(), record.into_value())
                    .await
            }
            None => MirrorStatus::NotConfigured,
        };
        let message = outcome_message(
            remote,
            format!("{label} saved successfully"),
            format!("{label} saved to local storage"),
        );
        StoreOutcome::success(message, remote)
    }

    /// Set the `status` of the first record whose identifying field equals `id`.
    pub async fn update_status(&self, id: &str, status: &str) -> StoreOutcome {
        let label = &self.config.label;
        let failed =
            || StoreOutcome::failure(format!("Failed to update {} status", label.to_lowercase()));

        if !self.storage.is_available() {
            warn!(collection = %self.config.name, "local storage unavailable; status not updated");
            return failed();
        }
        let mut records = match self.try_load().await {
            Ok(records) => records,
            Err(e) => {
                error!(collection = %self.config.name, err = %e, "error updating status");
                return failed();
            }
        };

        let id_field = &self.config.id_field;
        let Some(target) = records.iter_mut().find(|r| r.matches_id(id_field, id)) else {
            debug!(collection = %self.config.name, %id, "status update target not found");
            return StoreOutcome::not_found(format!("{label} not found"));
        };
        target.set_status(status);

        if let Err(e) = self.write_local(&records) {
            error!(collection = %self.config.name, err = %e, "error updating status");
            return failed();
        }
        info!(collection = %self.config.name, %id, %status, "status updated");

        let remote = match self.config.mirror.as_ref() {
            Some(endpoints) => {
                let body = self.status_body(id, status, &records);
                self.mirror(endpoints.update_status.clone(), body).await
            }
            None => MirrorStatus::NotConfigured,
        };
        let message = outcome_message(
            remote,
            format!("{label} status updated"),
            format!("{label} status updated in local storage"),
        );
        StoreOutcome::success(message, remote)
    }

    /// Overwrite the stored collection. Used by the receiving side of a status
    /// mirror, which ships the full updated collection.
    pub fn replace_all(&self, records: &[Record]) -> StoreOutcome {
        let label = &self.config.label;
        if let Err(e) = self.write_local(records) {
            error!(collection = %self.config.name, err = %e, "error replacing collection");
            return StoreOutcome::failure(format!("Failed to replace {} collection", label.to_lowercase()));
        }
        info!(collection = %self.config.name, total = records.len(), "collection replaced");
        StoreOutcome::success(format!("{label} collection replaced"), MirrorStatus::NotConfigured)
    }

    async fn try_load(&self) -> Result<Vec<Record>, CoreError> {
        let local = self.read_local()?;
        if !local.is_empty() {
            return Ok(local);
        }
        Ok(self.seed_from_remote().await.unwrap_or(local))
    }

    // One bounded attempt; None means "keep the empty local state".
    async fn seed_from_remote(&self) -> Option<Vec<Record>> {
        let resource = self.config.snapshot.as_deref()?;
        let remote = self.remote.as_ref()?;
        match remote.fetch_snapshot(resource).await {
            Ok(records) if records.is_empty() => {
                debug!(collection = %self.config.name, %resource, "remote snapshot empty");
                None
            }
            Ok(records) => {
                if let Err(e) = self.write_local(&records) {
                    warn!(collection = %self.config.name, err = %e, "could not persist remote snapshot");
                }
                info!(collection = %self.config.name, %resource, count = records.len(), "seeded from remote snapshot");
                Some(records)
            }
            Err(e) => {
                warn!(collection = %self.config.name, %resource, err = %e, "could not load remote snapshot; using empty local storage");
                None
            }
        }
    }

    fn read_local(&self) -> Result<Vec<Record>, CoreError> {
        if !self.storage.is_available() {
            return Err(CoreError::StorageUnavailable);
        }
        match self.storage.get_item(&self.config.storage_key)? {
            None => Ok(Vec::new()),
            Some(raw) if raw.trim().is_empty() => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|e| CoreError::Corrupt(e.to_string())),
        }
    }

    fn write_local(&self, records: &[Record]) -> Result<(), CoreError> {
        if !self.storage.is_available() {
            return Err(CoreError::StorageUnavailable);
        }
        let raw = serde_json::to_string(records).map_err(|e| CoreError::Storage(e.to_string()))?;
        self.storage.set_item(&self.config.storage_key, &raw)
    }

    fn salvage_local(&self) -> Vec<Record> {
        let Ok(Some(raw)) = self.storage.get_item(&self.config.storage_key) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(values) => values
                .into_iter()
                .filter_map(|v| Record::from_value(v).ok())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn status_body(&self, id: &str, status: &str, records: &[Record]) -> Value {
        let mut body = Map::new();
        body.insert(self.config.id_field.clone(), Value::String(id.to_string()));
        body.insert(STATUS_FIELD.to_string(), Value::String(status.to_string()));
        body.insert(
            self.config.name.clone(),
            Value::Array(records.iter().cloned().map(Record::into_value).collect()),
        );
        Value::Object(body)
    }

    async fn mirror(&self, endpoint: String, body: Value) -> MirrorStatus {
        let Some(remote) = self.remote.clone() else {
            debug!(collection = %self.config.name, %endpoint, "no remote backend; mirror skipped");
            return MirrorStatus::NotConfigured;
        };

        match self.policy {
            MirrorPolicy::Await => {
                let result = remote.push(&endpoint, &body).await;
                let status = match &result {
                    Ok(()) => MirrorStatus::Confirmed,
                    Err(e) => {
                        warn!(collection = %self.config.name, %endpoint, err = %e, "remote mirror failed; local storage updated");
                        MirrorStatus::Failed
                    }
                };
                send_report(
                    self.reports.as_ref(),
                    &self.config.name,
                    &endpoint,
                    result.err().map(|e| e.to_string()),
                );
                status
            }
            MirrorPolicy::Detached => {
                let Ok(handle) = tokio::runtime::Handle::try_current() else {
                    warn!(collection = %self.config.name, %endpoint, "no tokio runtime; mirror not dispatched");
                    return MirrorStatus::Failed;
                };
                let collection = self.config.name.clone();
                let reports = self.reports.clone();
                handle.spawn(async move {
                    let error = match remote.push(&endpoint, &body).await {
                        Ok(()) => {
                            debug!(%collection, %endpoint, "remote mirror accepted");
                            None
                        }
                        Err(e) => {
                            warn!(%collection, %endpoint, err = %e, "remote mirror failed; local storage updated");
                            Some(e.to_string())
                        }
                    };
                    send_report(reports.as_ref(), &collection, &endpoint, error);
                });
                MirrorStatus::Dispatched
            }
        }
    }
}

fn send_report(
    reports: Option<&mpsc::UnboundedSender<MirrorReport>>,
    collection: &str,
    endpoint: &str,
    error: Option<String>,
) {
    if let Some(tx) = reports {
        // receiver may be gone; reports are advisory
        let _ = tx.send(MirrorReport {
            collection: collection.to_string(),
            endpoint: endpoint.to_string(),
            error,
        });
    }
}

fn outcome_message(remote: MirrorStatus, confirmed: String, local_only: String) -> String {
    match remote {
        MirrorStatus::NotConfigured | MirrorStatus::Confirmed => confirmed,
        MirrorStatus::Failed => local_only,
        MirrorStatus::Dispatched => format!("{local_only}; remote sync dispatched"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_storage::{InMemoryStorage, UnavailableStorage};
    use crate::adapters::static_remote::StaticRemote;
    use crate::{FailureKind, RemoteError};
    use serde_json::json;

    fn booking(id: &str, status: &str) -> Record {
        Record::new()
            .with("bookingId", id)
            .with("carBrand", "Toyota")
            .with("status", status)
    }

    fn order(id: &str, status: &str) -> Record {
        Record::new()
            .with("orderId", id)
            .with("item", "brake pads")
            .with("status", status)
    }

    fn stored(records: &[Record]) -> String {
        serde_json::to_string(records).unwrap()
    }

    #[tokio::test]
    async fn unavailable_storage_reads_empty_and_rejects_writes() {
        let remote = Arc::new(
            StaticRemote::new().with_snapshot("data/bookings.json", vec![booking("A", "pending")]),
        );
        let store = RecordStore::new(UnavailableStorage, CollectionConfig::bookings())
            .with_remote(remote.clone());

        assert!(store.load().await.is_empty());
        assert!(store.list_all().await.is_empty());
        assert_eq!(remote.fetch_count(), 0);

        let out = store.append(booking("B", "pending")).await;
        assert!(!out.success);
        assert_eq!(out.message, "Failed to save booking");
        assert_eq!(out.failure, Some(FailureKind::Storage));

        let out = store.update_status("A", "confirmed").await;
        assert!(!out.success);
        assert_eq!(out.message, "Failed to update booking status");
    }

    #[tokio::test]
    async fn load_seeds_once_from_remote_snapshot() {
        let snapshot = vec![booking("A", "pending"), booking("B", "confirmed")];
        let remote = Arc::new(StaticRemote::new().with_snapshot("data/bookings.json", snapshot.clone()));
        let store = RecordStore::new(InMemoryStorage::new(), CollectionConfig::bookings())
            .with_remote(remote.clone());

        let first = store.load().await;
        assert_eq!(first, snapshot);
        assert_eq!(
            store.storage().get_item("bookings").unwrap(),
            Some(stored(&snapshot))
        );

        let second = store.load().await;
        assert_eq!(second, first);
        assert_eq!(remote.fetch_count(), 1);
    }

    #[tokio::test]
    async fn seeded_snapshot_keeps_remote_field_order() {
        let snapshot: Vec<Record> =
            serde_json::from_str(r#"[{"orderId":"A","status":"pending","amount":3}]"#).unwrap();
        let remote = Arc::new(
            StaticRemote::new().with_snapshot("data/purchase-orders.json", snapshot),
        );
        let store = RecordStore::new(InMemoryStorage::new(), CollectionConfig::orders())
            .with_remote(remote);

        store.load().await;
        assert_eq!(
            store.storage().get_item("purchaseOrders").unwrap().as_deref(),
            Some(r#"[{"orderId":"A","status":"pending","amount":3}]"#)
        );

        store.update_status("A", "paid").await;
        assert_eq!(
            store.storage().get_item("purchaseOrders").unwrap().as_deref(),
            Some(r#"[{"orderId":"A","status":"paid","amount":3}]"#)
        );
    }

    #[tokio::test]
    async fn load_swallows_remote_failure() {
        let remote = Arc::new(StaticRemote::new().with_snapshot_error(
            "data/purchase-orders.json",
            RemoteError::Network("connection refused".into()),
        ));
        let store = RecordStore::new(InMemoryStorage::new(), CollectionConfig::orders())
            .with_remote(remote.clone());

        assert!(store.load().await.is_empty());
        assert_eq!(store.storage().get_item("purchaseOrders").unwrap(), None);
        assert_eq!(remote.fetch_count(), 1);
    }

    #[tokio::test]
    async fn empty_remote_snapshot_is_not_persisted() {
        let remote = Arc::new(StaticRemote::new().with_snapshot("data/bookings.json", vec![]));
        let store = RecordStore::new(InMemoryStorage::new(), CollectionConfig::bookings())
            .with_remote(remote.clone());

        assert!(store.load().await.is_empty());
        assert!(store.storage().is_empty());
        // still empty locally, so the next load tries again
        store.load().await;
        assert_eq!(remote.fetch_count(), 2);
    }

    #[tokio::test]
    async fn present_local_value_skips_remote() {
        let local = vec![booking("L1", "pending")];
        let remote = Arc::new(
            StaticRemote::new().with_snapshot("data/bookings.json", vec![booking("R1", "pending")]),
        );
        let store = RecordStore::new(
            InMemoryStorage::with_item("bookings", stored(&local)),
            CollectionConfig::bookings(),
        )
        .with_remote(remote.clone());

        assert_eq!(store.load().await, local);
        assert_eq!(remote.fetch_count(), 0);
    }

    #[tokio::test]
    async fn append_then_load_returns_record_last() {
        let store = RecordStore::new(InMemoryStorage::new(), CollectionConfig::bookings());
        let first = booking("A", "pending");
        let second = booking("B", "pending").with("extra", json!({"nested": [1, 2]}));

        assert!(store.append(first.clone()).await.success);
        let out = store.append(second.clone()).await;
        assert!(out.success);
        assert_eq!(out.message, "Booking saved successfully");
        assert_eq!(out.remote, MirrorStatus::NotConfigured);

        let all = store.load().await;
        assert_eq!(all, vec![first, second]);
    }

    #[tokio::test]
    async fn append_does_not_seed_from_remote() {
        let remote = Arc::new(
            StaticRemote::new().with_snapshot("data/bookings.json", vec![booking("R1", "pending")]),
        );
        let store = RecordStore::new(InMemoryStorage::new(), CollectionConfig::bookings())
            .with_remote(remote.clone());

        store.append(booking("A", "pending")).await;
        let all = store.load().await;
        assert_eq!(all.len(), 1);
        assert_eq!(remote.fetch_count(), 0);
    }

    #[tokio::test]
    async fn update_status_changes_only_target() {
        let records = vec![
            booking("A", "pending"),
            booking("B", "pending"),
            booking("C", "pending"),
        ];
        let store = RecordStore::new(
            InMemoryStorage::with_item("bookings", stored(&records)),
            CollectionConfig::bookings(),
        );

        let out = store.update_status("B", "confirmed").await;
        assert!(out.success);
        assert_eq!(out.message, "Booking status updated");

        let after = store.load().await;
        assert_eq!(after.len(), 3);
        let ids: Vec<_> = after.iter().map(|r| r.id("bookingId").unwrap()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert_eq!(after.iter().filter(|r| r.status() == Some("confirmed")).count(), 1);
        assert_eq!(after[1].status(), Some("confirmed"));
        assert_eq!(after[1].get("carBrand"), Some(&json!("Toyota")));
    }

    #[tokio::test]
    async fn update_status_first_match_only() {
        let records = vec![booking("A", "pending"), booking("A", "pending")];
        let store = RecordStore::new(
            InMemoryStorage::with_item("bookings", stored(&records)),
            CollectionConfig::bookings(),
        );
        assert!(store.update_status("A", "cancelled").await.success);
        let after = store.load().await;
        assert_eq!(after[0].status(), Some("cancelled"));
        assert_eq!(after[1].status(), Some("pending"));
    }

    #[tokio::test]
    async fn update_status_missing_id_leaves_storage_untouched() {
        let raw = stored(&[booking("A", "pending")]);
        let store = RecordStore::new(
            InMemoryStorage::with_item("bookings", raw.clone()),
            CollectionConfig::bookings(),
        );

        let out = store.update_status("Z", "confirmed").await;
        assert!(!out.success);
        assert_eq!(out.message, "Booking not found");
        assert_eq!(out.failure, Some(FailureKind::NotFound));
        assert_eq!(store.storage().get_item("bookings").unwrap(), Some(raw));
    }

    #[tokio::test]
    async fn awaited_mirror_reports_confirmation() {
        let remote = Arc::new(StaticRemote::new());
        let store = RecordStore::new(InMemoryStorage::new(), CollectionConfig::orders())
            .with_remote(remote.clone())
            .with_mirror_policy(MirrorPolicy::Await);

        let rec = order("O-1", "pending");
        let out = store.append(rec.clone()).await;
        assert!(out.success);
        assert_eq!(out.remote, MirrorStatus::Confirmed);
        assert_eq!(out.message, "Order saved successfully");

        let out = store.update_status("O-1", "shipped").await;
        assert_eq!(out.message, "Order status updated");

        let pushes = remote.pushes();
        assert_eq!(pushes.len(), 2);
        assert_eq!(pushes[0], ("api/save-order".to_string(), rec.into_value()));
        let (endpoint, body) = &pushes[1];
        assert_eq!(endpoint, "api/update-order");
        assert_eq!(body["orderId"], json!("O-1"));
        assert_eq!(body["status"], json!("shipped"));
        assert_eq!(body["orders"][0]["status"], json!("shipped"));
    }

    #[tokio::test]
    async fn failed_mirror_never_fails_the_write() {
        let remote = Arc::new(StaticRemote::new().failing_pushes(RemoteError::Status(500)));
        let store = RecordStore::new(InMemoryStorage::new(), CollectionConfig::orders())
            .with_remote(remote.clone())
            .with_mirror_policy(MirrorPolicy::Await);

        let out = store.append(order("O-1", "pending")).await;
        assert!(out.success);
        assert_eq!(out.remote, MirrorStatus::Failed);
        assert_eq!(out.message, "Order saved to local storage");

        let out = store.update_status("O-1", "paid").await;
        assert!(out.success);
        assert_eq!(out.message, "Order status updated in local storage");
        assert_eq!(store.load().await[0].status(), Some("paid"));
    }

    #[tokio::test]
    async fn detached_mirror_reports_on_channel() {
        let remote = Arc::new(StaticRemote::new().failing_pushes(RemoteError::Network("down".into())));
        let mut store = RecordStore::new(InMemoryStorage::new(), CollectionConfig::orders())
            .with_remote(remote.clone());
        let mut reports = store.mirror_reports();

        let out = store.append(order("O-9", "pending")).await;
        assert!(out.success);
        assert_eq!(out.remote, MirrorStatus::Dispatched);
        assert_eq!(out.message, "Order saved to local storage; remote sync dispatched");

        let report = reports.recv().await.expect("mirror report");
        assert_eq!(report.collection, "orders");
        assert_eq!(report.endpoint, "api/save-order");
        assert!(!report.is_ok());
        assert_eq!(remote.pushes().len(), 1);
    }

    #[tokio::test]
    async fn hung_remote_never_blocks_detached_writes() {
        let remote = Arc::new(StaticRemote::new().hanging_pushes());
        let store = RecordStore::new(InMemoryStorage::new(), CollectionConfig::orders())
            .with_remote(remote);
        let limit = std::time::Duration::from_secs(1);

        let out = tokio::time::timeout(limit, store.append(order("O-1", "pending")))
            .await
            .expect("append returned while the mirror hangs");
        assert!(out.success);
        assert_eq!(out.remote, MirrorStatus::Dispatched);

        let out = tokio::time::timeout(limit, store.update_status("O-1", "paid"))
            .await
            .expect("update_status returned while the mirror hangs");
        assert!(out.success);
        assert_eq!(out.remote, MirrorStatus::Dispatched);
        assert_eq!(store.load().await[0].status(), Some("paid"));
    }

    #[tokio::test]
    async fn dropped_report_receiver_leaves_writes_intact() {
        let remote = Arc::new(StaticRemote::new());
        let mut store = RecordStore::new(InMemoryStorage::new(), CollectionConfig::orders())
            .with_remote(remote)
            .with_mirror_policy(MirrorPolicy::Await);
        drop(store.mirror_reports());

        let out = store.append(order("O-1", "pending")).await;
        assert!(out.success);
        assert_eq!(out.remote, MirrorStatus::Confirmed);
        assert_eq!(store.load().await.len(), 1);
    }

    #[tokio::test]
    async fn bookings_are_never_mirrored() {
        let remote = Arc::new(StaticRemote::new());
        let store = RecordStore::new(InMemoryStorage::new(), CollectionConfig::bookings())
            .with_remote(remote.clone())
            .with_mirror_policy(MirrorPolicy::Await);

        store.append(booking("A", "pending")).await;
        store.update_status("A", "confirmed").await;
        assert!(remote.pushes().is_empty());
    }

    #[tokio::test]
    async fn corrupt_value_loads_empty_and_blocks_writes() {
        let store = RecordStore::new(
            InMemoryStorage::with_item("bookings", "not json"),
            CollectionConfig::bookings(),
        );
        assert!(store.load().await.is_empty());
        assert!(!store.append(booking("A", "pending")).await.success);
        assert_eq!(
            store.storage().get_item("bookings").unwrap().as_deref(),
            Some("not json")
        );
    }

    #[tokio::test]
    async fn list_all_salvages_objects_from_mixed_array() {
        let store = RecordStore::new(
            InMemoryStorage::with_item("bookings", r#"[{"bookingId":"A"}, 3, "x", {"bookingId":"B"}]"#),
            CollectionConfig::bookings(),
        );
        let all = store.list_all().await;
        let ids: Vec<_> = all.iter().filter_map(|r| r.id("bookingId")).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn separate_keys_are_independent() {
        let storage = Arc::new(InMemoryStorage::new());
        let a = RecordStore::new(
            storage.clone(),
            CollectionConfig::bookings().with_storage_key("bookings-a"),
        );
        let b = RecordStore::new(
            storage.clone(),
            CollectionConfig::bookings().with_storage_key("bookings-b"),
        );
        a.append(booking("A", "pending")).await;
        assert_eq!(a.load().await.len(), 1);
        assert!(b.load().await.is_empty());
        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn replace_all_overwrites_collection() {
        let store = RecordStore::new(
            InMemoryStorage::with_item("purchaseOrders", stored(&[order("O-1", "pending")])),
            CollectionConfig::orders(),
        );
        let next = vec![order("O-1", "paid"), order("O-2", "pending")];
        assert!(store.replace_all(&next).success);
        assert_eq!(store.load().await, next);
    }

    #[test]
    fn mirror_policy_parsing() {
        assert_eq!(MirrorPolicy::parse("detached"), Some(MirrorPolicy::Detached));
        assert_eq!(MirrorPolicy::parse("AWAIT"), Some(MirrorPolicy::Await));
        assert_eq!(MirrorPolicy::parse("sometimes"), None);
    }
}
