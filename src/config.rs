//! Runtime Configuration
//!
//! Tunables are read from environment variables with sensible defaults so a
//! node can start with nothing but a bind address. The two batch sizes encode
//! the two-level fan-out: the controller splits a run into large chunks, the
//! dispatcher re-splits each chunk into worker-sized batches.

use std::str::FromStr;

/// Runtime tunables shared by the coordinator components and workers.
#[derive(Debug, Clone)]
pub struct Config {
    /// Credential expected in the `x-api-key` header on `POST /run`.
    pub api_key: String,
    /// Upstream pricing search endpoint workers query per item id.
    pub api_url: String,
    /// Base URL of the coordinator, used by out-of-process workers to
    /// publish results back.
    pub coordinator_url: String,
    /// Controller-level chunk size (ids per dispatch message).
    pub chunk_size: usize,
    /// Dispatcher-level batch size (ids per worker batch).
    pub batch_size: usize,
    /// Base gap between successive work publishes, in milliseconds.
    pub stagger_ms: u64,
    /// Delay before a held batch is requeued when no workers are active.
    pub hold_backoff_ms: u64,
    /// Consecutive holds after which fleet exhaustion is raised as an alert.
    pub hold_alert_threshold: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_key: env_or("HYDRA_API_KEY", "dev-key".to_string()),
            api_url: env_or("HYDRA_API_URL", "http://127.0.0.1:9100/price".to_string()),
            coordinator_url: env_or(
                "HYDRA_COORDINATOR_URL",
                "http://127.0.0.1:9000".to_string(),
            ),
            chunk_size: env_or("HYDRA_CHUNK_SIZE", 1000),
            batch_size: env_or("HYDRA_BATCH_SIZE", 40),
            stagger_ms: env_or("HYDRA_STAGGER_MS", 250),
            hold_backoff_ms: env_or("HYDRA_HOLD_BACKOFF_MS", 2000),
            hold_alert_threshold: env_or("HYDRA_HOLD_ALERT_THRESHOLD", 5),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Invalid value for {}, using default", key);
                default
            }
        },
        Err(_) => default,
    }
}
