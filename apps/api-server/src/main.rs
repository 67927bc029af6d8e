//! api-server: the remote side of the booking and purchase-order stores.
//!
//! Clients keep their collections in local storage and talk to this server
//! only to seed an empty collection and to mirror order writes:
//! - Snapshots: `GET /data/bookings.json`, `GET /data/purchase-orders.json`.
//! - Order mirror: `POST /api/save-order` (record body) and
//!   `POST /api/update-order` (`{orderId, status, orders}` body).
//! - Dashboard reads: `GET /api/records/:collection`.
//! - Catalog and pricing: `GET /api/catalog/...`, `GET /api/price`.
//!
//! Storage: in-memory or SQLite (file) when the `sqlite` feature is enabled.
//! Empty collections are filled at startup from `SNAPSHOT_DIR/bookings.json`
//! and `SNAPSHOT_DIR/purchase-orders.json` when those files exist.
//!
//! Run:
//! ```bash
//! # pretty logs (default); PORT optional
//! cargo run -p api-server
//!
//! # throwaway in-memory storage with JSON logs
//! STORAGE_PROVIDER=memory LOG_FORMAT=json cargo run -p api-server
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.
//!

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use domain::adapters::memory_storage::InMemoryStorage;
use domain::catalog;
use domain::store::RecordStore;
use domain::{CollectionConfig, CoreError, FailureKind, LocalStorage, Record, StoreOutcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Local storage abstraction supporting memory or sqlite (feature-gated).
enum StorageKind {
    Memory(InMemoryStorage),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite_adapter::SqliteStorage),
}

struct AnyStorage {
    kind: StorageKind,
}

impl AnyStorage {
    fn memory() -> Self {
        Self {
            kind: StorageKind::Memory(InMemoryStorage::new()),
        }
    }

    #[cfg(feature = "sqlite")]
    fn sqlite(path: &std::path::Path) -> Result<Self, CoreError> {
        Ok(Self {
            kind: StorageKind::Sqlite(sqlite_adapter::SqliteStorage::open_creating_dirs(path)?),
        })
    }
}

impl LocalStorage for AnyStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, CoreError> {
        match &self.kind {
            StorageKind::Memory(s) => s.get_item(key),
            #[cfg(feature = "sqlite")]
            StorageKind::Sqlite(s) => s.get_item(key),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), CoreError> {
        match &self.kind {
            StorageKind::Memory(s) => s.set_item(key, value),
            #[cfg(feature = "sqlite")]
            StorageKind::Sqlite(s) => s.set_item(key, value),
        }
    }
}

type SharedStore = Arc<RecordStore<Arc<AnyStorage>>>;

/// Concurrent requests against one collection race on its whole-array
/// read-modify-write; the last writer wins.
#[derive(Clone)]
struct AppState {
    bookings: SharedStore,
    orders: SharedStore,
}

impl AppState {
    // The server is the source of truth: it neither seeds from nor mirrors to
    // another remote.
    fn new(storage: Arc<AnyStorage>) -> Self {
        let server_side = |cfg: CollectionConfig| {
            Arc::new(RecordStore::new(
                storage.clone(),
                cfg.with_snapshot(None).with_mirror(None),
            ))
        };
        Self {
            bookings: server_side(CollectionConfig::bookings()),
            orders: server_side(CollectionConfig::orders()),
        }
    }

    /// Fill empty collections from the snapshot files in `dir`. A collection
    /// that already holds records (a reopened SQLite file) is left alone.
    async fn seed_from_dir(&self, dir: &std::path::Path) {
        let files = [
            (&self.bookings, "bookings.json"),
            (&self.orders, "purchase-orders.json"),
        ];
        for (store, file) in files {
            let collection = &store.config().name;
            let path = dir.join(file);
            let raw = match tokio::fs::read_to_string(&path).await {
                Ok(raw) => raw,
                Err(e) => {
                    debug!(%collection, path = %path.display(), err = %e, "no snapshot file");
                    continue;
                }
            };
            let records: Vec<Record> = match serde_json::from_str(&raw) {
                Ok(records) => records,
                Err(e) => {
                    warn!(%collection, path = %path.display(), err = %e, "snapshot file is not an array of objects; skipped");
                    continue;
                }
            };
            if !store.load().await.is_empty() {
                debug!(%collection, "collection already populated; snapshot file ignored");
                continue;
            }
            let out = store.replace_all(&records);
            info!(%collection, path = %path.display(), count = records.len(), success = out.success, "seeded from snapshot file");
        }
    }

    fn collection(&self, name: &str) -> Option<&SharedStore> {
        match name {
            "bookings" => Some(&self.bookings),
            "orders" => Some(&self.orders),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);
    cfg.warn_if_ephemeral();

    let state = AppState::new(Arc::new(build_storage(&cfg)));
    state.seed_from_dir(&cfg.snapshot_dir).await;

    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    let mut app = router(state)
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid));

    // CORS - already validated in Config::from_env()
    let cors = if cfg.cors_allow_origin == HeaderValue::from_static("*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([cfg.cors_allow_origin]))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    };
    app = app.layer(cors);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    info!(%addr, "api-server listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind port");
    axum::serve(listener, app).await.expect("server error");
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/data/bookings.json", get(bookings_snapshot))
        .route("/data/purchase-orders.json", get(orders_snapshot))
        .route("/api/save-order", post(save_order))
        .route("/api/update-order", post(update_order))
        .route("/api/records/:collection", get(list_collection))
        .route("/api/catalog/brands", get(catalog_brands))
        .route("/api/catalog/locations", get(catalog_locations))
        .route("/api/catalog/models/:brand", get(catalog_models))
        .route("/api/price", get(price))
        .with_state(state)
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

// Construct the key space based on config and feature flags.
fn build_storage(cfg: &config::Config) -> AnyStorage {
    match cfg.storage_provider {
        #[cfg(feature = "sqlite")]
        config::StorageProvider::Sqlite => match AnyStorage::sqlite(&cfg.db_path) {
            Ok(s) => {
                info!(db_path = %cfg.db_path.display(), "using sqlite storage");
                s
            }
            Err(e) => {
                error!(err = %e, "failed to open sqlite storage; falling back to memory");
                AnyStorage::memory()
            }
        },
        _ => AnyStorage::memory(),
    }
}

fn outcome_response(out: StoreOutcome, ok: StatusCode) -> Response {
    let status = match out.failure {
        None => ok,
        Some(FailureKind::NotFound) => StatusCode::NOT_FOUND,
        Some(FailureKind::Storage) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(out)).into_response()
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

async fn bookings_snapshot(State(state): State<AppState>) -> Json<Vec<Record>> {
    Json(state.bookings.list_all().await)
}

async fn orders_snapshot(State(state): State<AppState>) -> Json<Vec<Record>> {
    Json(state.orders.list_all().await)
}

async fn list_collection(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Response {
    match state.collection(&collection) {
        Some(store) => Json(store.list_all().await).into_response(),
        None => {
            warn!(%collection, "unknown collection");
            (
                StatusCode::NOT_FOUND,
                Json(http_common::json_err("unknown_collection")),
            )
                .into_response()
        }
    }
}

// Two overlapping saves can drop one order; see `AppState`.
async fn save_order(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let record = match Record::from_value(body) {
        Ok(r) => r,
        Err(e) => {
            warn!(err = %e, "rejected order body");
            return (
                StatusCode::BAD_REQUEST,
                Json(http_common::json_error_with_message(
                    "bad_request",
                    &e.to_string(),
                )),
            )
                .into_response();
        }
    };
    outcome_response(state.orders.append(record).await, StatusCode::CREATED)
}

#[derive(Deserialize)]
struct UpdateOrderReq {
    #[serde(rename = "orderId")]
    order_id: String,
    status: String,
    /// Full collection as the client sees it after the update.
    #[serde(default)]
    orders: Option<Vec<Record>>,
}

async fn update_order(
    State(state): State<AppState>,
    Json(body): Json<UpdateOrderReq>,
) -> Response {
    match body.orders {
        Some(orders) => {
            info!(order_id = %body.order_id, status = %body.status, total = orders.len(), "replacing orders from client collection");
            outcome_response(state.orders.replace_all(&orders), StatusCode::OK)
        }
        None => outcome_response(
            state
                .orders
                .update_status(&body.order_id, &body.status)
                .await,
            StatusCode::OK,
        ),
    }
}

async fn catalog_brands() -> Json<&'static [&'static str]> {
    Json(catalog::car_brands())
}

async fn catalog_locations() -> Json<&'static [&'static str]> {
    Json(catalog::accra_locations())
}

async fn catalog_models(Path(brand): Path<String>) -> Json<&'static [&'static str]> {
    Json(catalog::car_models(&brand))
}

#[derive(Deserialize)]
struct PriceQuery {
    brand: String,
    #[serde(default)]
    model: String,
    days: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PriceOut {
    brand: String,
    model: String,
    days: u32,
    daily_rate: u32,
    price: u64,
}

async fn price(Query(q): Query<PriceQuery>) -> Json<PriceOut> {
    Json(PriceOut {
        daily_rate: catalog::base_daily_price(&q.brand),
        price: catalog::booking_price(&q.brand, &q.model, q.days),
        brand: q.brand,
        model: q.model,
        days: q.days,
    })
}
