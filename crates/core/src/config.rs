//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Mark cookies as Secure (HTTPS-only deployments).
    #[serde(default)]
    pub cookie_secure: bool,
    /// Browser origins allowed to call the API with credentials.
    #[serde(default = "default_allow_origins")]
    pub allow_origins: Vec<String>,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_allow_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cookie_secure: false,
            allow_origins: default_allow_origins(),
        }
    }
}

/// Datastore configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// Busy timeout in seconds for concurrent access.
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/bazaar.db")
}

fn default_busy_timeout_secs() -> u64 {
    5
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_secs: default_busy_timeout_secs(),
        }
    }
}

/// Session configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Absolute session lifetime in days.
    #[serde(default = "default_session_ttl_days")]
    pub ttl_days: i64,
}

fn default_session_ttl_days() -> i64 {
    30
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_session_ttl_days(),
        }
    }
}

impl SessionConfig {
    /// Get the session lifetime as a Duration.
    pub fn ttl(&self) -> Duration {
        Duration::days(self.ttl_days)
    }
}

/// Catalog configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Optional JSON file of products to seed an empty datastore with.
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
    /// Base URL for product images. Without it, image URLs are served
    /// under a local /images prefix.
    #[serde(default)]
    pub image_base_url: Option<String>,
}

/// Top-level application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl AppConfig {
    /// Create a test configuration with defaults suitable for integration
    /// tests. The database path is expected to be overridden by the caller.
    pub fn for_testing() -> Self {
        Self::default()
    }
}
