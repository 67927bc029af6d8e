//! store-cli: command-line client of the booking and purchase-order stores.
//!
//! Records live in a local SQLite key space (`STORE_DB_PATH`). When
//! `REMOTE_BASE_URL` points at an api-server, empty collections are seeded
//! from its snapshots and order writes are mirrored to it.

mod config;

use std::env;
use std::io::{self, Write};
use std::process;
use std::sync::Arc;
use std::time::SystemTime;

use domain::catalog;
use domain::store::RecordStore;
use domain::{CollectionConfig, LocalStorage, Record, RemoteBackend, StoreOutcome};
use http_remote::HttpRemote;
use sqlite_adapter::SqliteStorage;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn print_usage() {
    eprintln!(
        "{}\n\nUsage:\n  store-cli list <bookings|orders>\n  store-cli book <brand> <model> <location> <days>\n  store-cli order <json-object>\n  store-cli update-status <bookings|orders> <id> <status>\n  store-cli brands | locations | models <brand>\n  store-cli price <brand> <model> <days>\n\nEnvironment:\n  STORE_DB_PATH, REMOTE_BASE_URL, REMOTE_TIMEOUT_SECS, MIRROR_POLICY, LOG_FORMAT",
        domain::about()
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Collection {
    Bookings,
    Orders,
}

impl Collection {
    fn parse(s: &str) -> Result<Self, String> {
        match s {
            "bookings" => Ok(Self::Bookings),
            "orders" => Ok(Self::Orders),
            other => Err(format!("unknown collection: {} (expected bookings or orders)", other)),
        }
    }
}

#[derive(Debug, PartialEq)]
enum Command {
    List(Collection),
    Book {
        brand: String,
        model: String,
        location: String,
        days: u32,
    },
    Order(Record),
    UpdateStatus {
        collection: Collection,
        id: String,
        status: String,
    },
    Brands,
    Locations,
    Models(String),
    Price {
        brand: String,
        model: String,
        days: u32,
    },
    Help,
}

fn parse_days(s: &str) -> Result<u32, String> {
    s.parse::<u32>()
        .map_err(|_| format!("invalid <days>: {}", s))
}

fn nth<'a>(args: &'a [String], i: usize, name: &str) -> Result<&'a str, String> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| format!("missing <{}>", name))
}

fn parse_command(args: &[String]) -> Result<Command, String> {
    let arg = |i: usize, name: &str| nth(args, i, name);

    let Some(cmd) = args.first() else {
        return Ok(Command::Help);
    };
    let command = match cmd.as_str() {
        "list" => Command::List(Collection::parse(arg(1, "collection")?)?),
        "book" => Command::Book {
            brand: arg(1, "brand")?.to_string(),
            model: arg(2, "model")?.to_string(),
            location: arg(3, "location")?.to_string(),
            days: parse_days(arg(4, "days")?)?,
        },
        "order" => {
            let raw = arg(1, "json-object")?;
            let value: serde_json::Value =
                serde_json::from_str(raw).map_err(|e| format!("invalid order json: {}", e))?;
            Command::Order(Record::from_value(value).map_err(|e| e.to_string())?)
        }
        "update-status" => Command::UpdateStatus {
            collection: Collection::parse(arg(1, "collection")?)?,
            id: arg(2, "id")?.to_string(),
            status: arg(3, "status")?.to_string(),
        },
        "brands" => Command::Brands,
        "locations" => Command::Locations,
        "models" => Command::Models(arg(1, "brand")?.to_string()),
        "price" => Command::Price {
            brand: arg(1, "brand")?.to_string(),
            model: arg(2, "model")?.to_string(),
            days: parse_days(arg(3, "days")?)?,
        },
        _ => Command::Help,
    };
    Ok(command)
}

struct Stores<S: LocalStorage> {
    bookings: RecordStore<S>,
    orders: RecordStore<S>,
}

impl<S: LocalStorage> Stores<S> {
    fn pick(&self, collection: Collection) -> &RecordStore<S> {
        match collection {
            Collection::Bookings => &self.bookings,
            Collection::Orders => &self.orders,
        }
    }
}

fn new_booking(brand: &str, model: &str, location: &str, days: u32) -> Record {
    Record::new()
        .with("bookingId", http_common::generate_id("BK"))
        .with("carBrand", brand)
        .with("carModel", model)
        .with("pickupLocation", location)
        .with("rentalDays", days)
        .with("totalPrice", catalog::booking_price(brand, model, days))
        .with("status", "pending")
        .with(
            "createdAt",
            http_common::system_time_to_rfc3339(SystemTime::now()),
        )
}

fn report(out: &mut impl Write, outcome: &StoreOutcome) -> Result<(), String> {
    if !outcome.success {
        return Err(outcome.message.clone());
    }
    writeln!(out, "{}", outcome.message).map_err(|e| e.to_string())
}

fn print_lines<'a>(
    out: &mut impl Write,
    lines: impl IntoIterator<Item = &'a str>,
) -> Result<(), String> {
    for line in lines {
        writeln!(out, "{}", line).map_err(|e| e.to_string())?;
    }
    Ok(())
}

async fn execute<S: LocalStorage>(
    cmd: Command,
    stores: &Stores<S>,
    out: &mut impl Write,
) -> Result<(), String> {
    match cmd {
        Command::List(collection) => {
            let records = stores.pick(collection).list_all().await;
            let body = serde_json::to_string_pretty(&records).map_err(|e| e.to_string())?;
            writeln!(out, "{}", body).map_err(|e| e.to_string())
        }
        Command::Book {
            brand,
            model,
            location,
            days,
        } => {
            let booking = new_booking(&brand, &model, &location, days);
            let id = booking.id("bookingId").unwrap_or_default().to_string();
            let outcome = stores.bookings.append(booking).await;
            report(out, &outcome)?;
            writeln!(out, "bookingId: {}", id).map_err(|e| e.to_string())
        }
        Command::Order(record) => report(out, &stores.orders.append(record).await),
        Command::UpdateStatus {
            collection,
            id,
            status,
        } => report(
            out,
            &stores.pick(collection).update_status(&id, &status).await,
        ),
        Command::Brands => print_lines(out, catalog::car_brands().iter().copied()),
        Command::Locations => print_lines(out, catalog::accra_locations().iter().copied()),
        Command::Models(brand) => print_lines(out, catalog::car_models(&brand).iter().copied()),
        Command::Price { brand, model, days } => writeln!(
            out,
            "{}",
            catalog::booking_price(&brand, &model, days)
        )
        .map_err(|e| e.to_string()),
        Command::Help => {
            print_usage();
            Ok(())
        }
    }
}

fn init_tracing(cfg: &config::Config) {
    // stdout carries command output; logs go to stderr
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .init(),
        config::LogFormat::Pretty => registry
            .with(fmt::layer().with_target(true).with_writer(io::stderr))
            .init(),
    }
}

async fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().skip(1).collect(); // skip program name
    let cmd = parse_command(&args)?;
    if cmd == Command::Help {
        print_usage();
        return Ok(());
    }

    let cfg = config::Config::from_env().map_err(|e| e.to_string())?;
    init_tracing(&cfg);

    let storage = if cfg.is_in_memory() {
        SqliteStorage::in_memory()
    } else {
        SqliteStorage::open_creating_dirs(&cfg.db_path)
    }
    .map_err(|e| format!("cannot open local storage: {}", e))?;
    let storage = Arc::new(storage);
    debug!(db_path = %cfg.db_path.display(), "local storage opened");

    let remote: Option<Arc<dyn RemoteBackend>> = HttpRemote::from_env()
        .map_err(|e| e.to_string())?
        .map(|r| {
            info!(base_url = %r.base_url(), "remote backend configured");
            Arc::new(r) as Arc<dyn RemoteBackend>
        });

    let build = |collection: CollectionConfig| {
        let store = RecordStore::new(storage.clone(), collection).with_mirror_policy(cfg.mirror_policy);
        match &remote {
            Some(r) => store.with_remote(r.clone()),
            None => store,
        }
    };
    let stores = Stores {
        bookings: build(CollectionConfig::bookings()),
        orders: build(CollectionConfig::orders()),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(cmd, &stores, &mut out).await
}

#[tokio::main]
async fn main() {
    if let Err(msg) = run().await {
        eprintln!("error: {}", msg);
        process::exit(1);
    }
}
