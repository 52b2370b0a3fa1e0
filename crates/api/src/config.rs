//! Application configuration loaded from environment variables.

use std::str::FromStr;

use resilience::ResilienceConfig;
use saga::PublisherConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Resilience settings for each downstream dependency.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DependencyConfig {
    pub restaurant: ResilienceConfig,
    pub accounting: ResilienceConfig,
    pub kitchen: ResilienceConfig,
    pub delivery: ResilienceConfig,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL connection string; orders are kept in
///   memory when unset
/// - `EVENT_PUBLISHER_WORKERS` (default: `2`)
/// - `EVENT_PUBLISHER_QUEUE_CAPACITY` (default: `25`)
/// - `MESSAGE_BUS_PARTITIONS` (default: `3`)
/// - `MESSAGE_BUS_RETENTION`: messages kept per partition (default: `1024`)
///
/// Per-dependency resilience settings are read with the prefixes
/// `RESTAURANT_SERVICE`, `ACCOUNTING_SERVICE`, `KITCHEN_SERVICE` and
/// `DELIVERY_SERVICE`; see [`ResilienceConfig`].
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub publisher: PublisherConfig,
    pub bus_partitions: u32,
    pub bus_retention: usize,
    pub dependencies: DependencyConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or("PORT", lookup("PORT"), defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: parse_or("LOG_FORMAT", lookup("LOG_FORMAT"), defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            publisher: PublisherConfig {
                workers: parse_or(
                    "EVENT_PUBLISHER_WORKERS",
                    lookup("EVENT_PUBLISHER_WORKERS"),
                    defaults.publisher.workers,
                )
                .max(1),
                queue_capacity: parse_or(
                    "EVENT_PUBLISHER_QUEUE_CAPACITY",
                    lookup("EVENT_PUBLISHER_QUEUE_CAPACITY"),
                    defaults.publisher.queue_capacity,
                )
                .max(1),
            },
            bus_partitions: parse_or(
                "MESSAGE_BUS_PARTITIONS",
                lookup("MESSAGE_BUS_PARTITIONS"),
                defaults.bus_partitions,
            )
            .max(1),
            bus_retention: parse_or(
                "MESSAGE_BUS_RETENTION",
                lookup("MESSAGE_BUS_RETENTION"),
                defaults.bus_retention,
            )
            .max(1),
            dependencies: DependencyConfig {
                restaurant: ResilienceConfig::from_lookup(RESTAURANT_SERVICE_PREFIX, &lookup),
                accounting: ResilienceConfig::from_lookup(ACCOUNTING_SERVICE_PREFIX, &lookup),
                kitchen: ResilienceConfig::from_lookup(KITCHEN_SERVICE_PREFIX, &lookup),
                delivery: ResilienceConfig::from_lookup(DELIVERY_SERVICE_PREFIX, &lookup),
            },
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            publisher: PublisherConfig::default(),
            bus_partitions: 3,
            bus_retention: messaging::DEFAULT_RETENTION,
            dependencies: DependencyConfig::default(),
        }
    }
}

const RESTAURANT_SERVICE_PREFIX: &str = "RESTAURANT_SERVICE";
const ACCOUNTING_SERVICE_PREFIX: &str = "ACCOUNTING_SERVICE";
const KITCHEN_SERVICE_PREFIX: &str = "KITCHEN_SERVICE";
const DELIVERY_SERVICE_PREFIX: &str = "DELIVERY_SERVICE";

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(%key, value = %raw, "unparseable setting, using default");
            default
        }),
    }
}
