//! Environment configuration for store-cli.

use std::env;
use std::fmt;
use std::path::PathBuf;

use domain::store::MirrorPolicy;

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

#[derive(Debug)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration error for {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Client configuration. The remote backend is configured separately through
/// `REMOTE_BASE_URL` and `REMOTE_TIMEOUT_SECS` (see `http_remote::HttpRemote::from_env`).
#[derive(Debug, Clone)]
pub struct Config {
    /// Local key space file (default: ./data/client.db); `:memory:` keeps nothing.
    pub db_path: PathBuf,
    pub mirror_policy: MirrorPolicy,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(
            env::var("STORE_DB_PATH").ok(),
            env::var("MIRROR_POLICY").ok(),
            env::var("LOG_FORMAT").ok(),
        )
    }

    fn from_vars(
        db_path: Option<String>,
        mirror_policy: Option<String>,
        log_format: Option<String>,
    ) -> Result<Self, ConfigError> {
        let db_path = db_path
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/client.db"));

        // Commands exit right after a write, so a detached mirror would be
        // dropped with the runtime; await by default here.
        let mirror_policy = match mirror_policy.filter(|s| !s.trim().is_empty()) {
            None => MirrorPolicy::Await,
            Some(s) => MirrorPolicy::parse(s.trim()).ok_or_else(|| ConfigError {
                field: "MIRROR_POLICY",
                message: format!("expected 'await' or 'detached', got '{}'", s),
            })?,
        };

        let log_format = LogFormat::from_str(log_format.as_deref().unwrap_or("pretty"));

        Ok(Self {
            db_path,
            mirror_policy,
            log_format,
        })
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path.as_os_str() == ":memory:"
    }
}
