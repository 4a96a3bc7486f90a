//! Configuration loader
//!
//! Builds the application configuration from defaults, an optional file and
//! environment variables.
//!
//! ## Loading Strategy
//! 1. Start from [`Config::default`]
//! 2. If `RESTOCK_CONFIG` names a file, load it instead (JSON or TOML by
//!    extension; missing keys keep their defaults)
//! 3. Apply environment overrides
//! 4. Validate the result
//!
//! ## Environment Variables
//! - `PORT`: HTTP port
//! - `WORKERS`: worker pool size
//! - `QUEUE_SIZE`: event queue capacity
//! - `BATCH_SIZE`: batch accumulator size trigger
//! - `BATCH_FLUSH_INTERVAL`: batch accumulator timer (`1s`, `500ms`)
//! - `MAX_RETRY_ATTEMPTS`, `INITIAL_RETRY_DELAY`, `MAX_RETRY_DELAY`,
//!   `RETRY_MULTIPLIER`: retry policy
//! - `CIRCUIT_BREAKER_THRESHOLD`, `CIRCUIT_BREAKER_TIMEOUT`: breaker policy
//! - `SHUTDOWN_GRACE`: how long shutdown waits for the queue to drain
//!
//! A variable that is set but cannot be parsed is ignored with a warning and
//! the value from the file (or the default) stays in effect.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use restock_common::time::parse_duration;
use restock_domain::{Config, RestockError, Result};

/// Environment variable naming an optional config file
pub const CONFIG_PATH_ENV: &str = "RESTOCK_CONFIG";

/// Load configuration from the optional file and the environment
///
/// # Errors
/// Returns `RestockError::Config` if:
/// - `RESTOCK_CONFIG` points at a missing or malformed file
/// - The merged configuration fails validation
pub fn load() -> Result<Config> {
    let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
        Some(path) => load_from_file(Path::new(&path))?,
        None => Config::default(),
    };

    apply_env_overrides(&mut config);
    config.validate()?;

    tracing::info!(
        port = config.server.port,
        workers = config.pipeline.workers,
        queue_capacity = config.pipeline.queue_capacity,
        "Configuration loaded"
    );
    Ok(config)
}

/// Load configuration from a file
///
/// Supports JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `RestockError::Config` if the file is missing, unreadable or
/// malformed.
pub fn load_from_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(RestockError::Config(format!("Config file not found: {}", path.display())));
    }

    tracing::info!(path = %path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| RestockError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| RestockError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| RestockError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(RestockError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Overwrite fields from environment variables that are set and valid
pub fn apply_env_overrides(config: &mut Config) {
    override_with(&mut config.server.port, "PORT", env_parse);
    override_with(&mut config.server.shutdown_grace, "SHUTDOWN_GRACE", env_duration);

    override_with(&mut config.pipeline.workers, "WORKERS", env_parse);
    override_with(&mut config.pipeline.queue_capacity, "QUEUE_SIZE", env_parse);

    override_with(&mut config.batch.batch_size, "BATCH_SIZE", env_parse);
    override_with(&mut config.batch.flush_interval, "BATCH_FLUSH_INTERVAL", env_duration);

    override_with(&mut config.retry.max_attempts, "MAX_RETRY_ATTEMPTS", env_parse);
    override_with(&mut config.retry.initial_delay, "INITIAL_RETRY_DELAY", env_duration);
    override_with(&mut config.retry.max_delay, "MAX_RETRY_DELAY", env_duration);
    override_with(&mut config.retry.multiplier, "RETRY_MULTIPLIER", env_parse);

    override_with(
        &mut config.circuit_breaker.failure_threshold,
        "CIRCUIT_BREAKER_THRESHOLD",
        env_parse,
    );
    override_with(&mut config.circuit_breaker.timeout, "CIRCUIT_BREAKER_TIMEOUT", env_duration);
}

/// Path from `RESTOCK_CONFIG`, if set
pub fn config_path() -> Option<PathBuf> {
    std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from)
}

fn override_with<T>(slot: &mut T, key: &str, read: fn(&str) -> Option<T>) {
    if let Some(value) = read(key) {
        *slot = value;
    }
}

/// Parse a variable with `FromStr`
///
/// Returns `None` when the variable is unset, empty or invalid.
fn env_parse<T: FromStr>(key: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).ok().filter(|s| !s.trim().is_empty())?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "Ignoring invalid environment value");
            None
        }
    }
}

fn env_duration(key: &str) -> Option<Duration> {
    let raw = std::env::var(key).ok().filter(|s| !s.trim().is_empty())?;
    match parse_duration(raw.trim()) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "Ignoring invalid environment duration");
            None
        }
    }
}
