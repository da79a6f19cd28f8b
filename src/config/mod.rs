//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Highest tick rate that still yields a non-zero microsecond period
const MAX_TICK_RATE_HZ: u32 = 1_000_000;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines instead of the human readable format
    pub log_json: bool,

    /// Simulation ticks per second
    pub tick_rate_hz: u32,
    /// Broadcast a snapshot every N ticks
    pub snapshot_every_ticks: u32,
    /// Period of the ping/pong liveness sweep
    pub heartbeat_interval: Duration,

    /// Pending outbound bytes above which a connection skips snapshots
    pub max_buffered_bytes: usize,
    /// Capacity of each connection's outbound frame queue
    pub outbound_queue_frames: usize,
    /// Largest inbound WebSocket message accepted
    pub max_message_bytes: usize,

    /// Seed for hazard generation; random when unset
    pub world_seed: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // PORT wins over SERVER_ADDR so hosted platforms work unchanged
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let log_format = lookup("LOG_FORMAT").unwrap_or_else(|| "pretty".to_string());

        let tick_rate_hz = positive(&lookup, "TICK_RATE_HZ", 60)?;
        if tick_rate_hz > MAX_TICK_RATE_HZ {
            return Err(ConfigError::Invalid("TICK_RATE_HZ"));
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_json: log_format.eq_ignore_ascii_case("json"),

            tick_rate_hz,
            snapshot_every_ticks: positive(&lookup, "SNAPSHOT_EVERY_TICKS", 1)?,
            heartbeat_interval: Duration::from_secs(positive(
                &lookup,
                "HEARTBEAT_INTERVAL_SECS",
                30,
            )?),

            max_buffered_bytes: parsed(&lookup, "MAX_BUFFERED_BYTES", 256 * 1024)?,
            outbound_queue_frames: positive(&lookup, "OUTBOUND_QUEUE_FRAMES", 64)?,
            max_message_bytes: positive(&lookup, "MAX_MESSAGE_BYTES", 64 * 1024)?,

            world_seed: lookup("WORLD_SEED")
                .map(|raw| raw.parse().map_err(|_| ConfigError::Invalid("WORLD_SEED")))
                .transpose()?,
        })
    }

    /// Wall-clock length of one simulation tick
    pub fn tick_period(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.tick_rate_hz as u64)
    }
}

fn parsed<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

fn positive<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + PartialOrd + Default,
{
    let value = parsed(lookup, key, default)?;
    if value <= T::default() {
        return Err(ConfigError::Invalid(key));
    }
    Ok(value)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
