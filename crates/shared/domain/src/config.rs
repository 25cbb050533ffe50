use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level API configuration shared across services.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfigInner {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub booking: BookingConfig,
    pub feed: FeedConfig,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(flatten, default)]
    inner: Arc<ApiConfigInner>,
}

impl Deref for ApiConfig {
    type Target = ApiConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for ApiConfig {
    fn deref_mut(&mut self) -> &mut ApiConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
    pub ssl: Option<SslConfig>,
}

/// TLS certificate/key paths.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SslConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// `SurrealDB` connection configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub credentials: Option<DatabaseCredentials>,
}

/// `SurrealDB` root credentials (optional when using unauthenticated engines like mem://).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseCredentials {
    pub username: String,
    pub password: String,
}

/// Booking engine knobs: slot granularity and policy windows.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    /// Candidate slot step, in minutes.
    pub slot_step_minutes: u32,
    /// Fallback duration for services that do not declare one, in minutes.
    pub default_service_duration_minutes: u32,
    /// Minimum lead time before the appointment start to allow cancellation.
    pub cancellation_cutoff_hours: i64,
    /// Minimum lead time before the appointment start to allow rescheduling.
    pub reschedule_cutoff_hours: i64,
    /// TTL for cached day-availability computations, in seconds.
    pub availability_cache_ttl_seconds: u64,
    /// Max bound of cached day-availability entries.
    pub availability_cache_capacity: u64,
}

/// Live feed tuning: reconnect schedule and buffer bounds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// How many times the client retries a dropped connection before giving up.
    pub max_reconnect_attempts: u32,
    /// First reconnect delay; doubles on each subsequent attempt.
    pub initial_backoff_ms: u64,
    /// Upper bound for the reconnect delay.
    pub max_backoff_ms: u64,
    /// How many feed items the client retains.
    pub history_limit: usize,
    /// Per-salon broadcast buffer for connected subscribers.
    pub channel_capacity: usize,
}

// --- Default ---

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: 4710, ssl: None }
    }
}

impl Default for SslConfig {
    fn default() -> Self {
        Self { cert: PathBuf::from("cert.pem"), key: PathBuf::from("key.pem") }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "mem://".to_owned(),
            namespace: "bloom".to_owned(),
            database: "core".to_owned(),
            // Embedded engines run unauthenticated; hosted engines get
            // credentials from the config file or environment.
            credentials: None,
        }
    }
}

impl Default for DatabaseCredentials {
    fn default() -> Self {
        Self { username: "root".to_owned(), password: "root".to_owned() }
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            slot_step_minutes: 30,
            default_service_duration_minutes: 60,
            cancellation_cutoff_hours: 24,
            reschedule_cutoff_hours: 24,
            availability_cache_ttl_seconds: 30,
            availability_cache_capacity: 10_000,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 5,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 30_000,
            history_limit: 100,
            channel_capacity: 128,
        }
    }
}
