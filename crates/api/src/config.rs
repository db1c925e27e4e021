//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use coordinator::CoordinatorConfig;
use delivery_cache::RedisConfig;
use delivery_store::DatabaseConfig;
use thiserror::Error;

/// A configuration value that could not be parsed.
#[derive(Debug, Error)]
#[error("invalid value for {name}: {value:?}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration with defaults matching a local development setup.
///
/// Reads from environment variables:
/// - `HOST`, `PORT`: bind address (default `0.0.0.0:8081`)
/// - `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_NAME`, `DB_SSLMODE`,
///   `DB_MAX_CONNECTIONS`: PostgreSQL connection
/// - `REDIS_HOST`, `REDIS_PORT`, `REDIS_PASSWORD`, `REDIS_DB`: Redis connection
/// - `CACHE_TTL_SECS`: cache entry lifetime (default one day)
/// - `STORE_TIMEOUT_MS`, `CACHE_TIMEOUT_MS`: per-call bounds
/// - `RUN_MIGRATIONS`: apply migrations on startup (default `true`)
/// - `LOG_FORMAT`: `json` for JSON logs, anything else for text
/// - `RUST_LOG`: tracing filter directive (default `"info"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub cache_ttl: Duration,
    pub coordinator: CoordinatorConfig,
    pub run_migrations: bool,
    pub log_format: LogFormat,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup`, which maps a variable name to
    /// its value if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let db = defaults.database;
        let redis = defaults.redis;

        let database = DatabaseConfig {
            host: lookup("DB_HOST").unwrap_or(db.host),
            port: parse(&lookup, "DB_PORT", db.port)?,
            user: lookup("DB_USER").unwrap_or(db.user),
            password: lookup("DB_PASSWORD").unwrap_or(db.password),
            database: lookup("DB_NAME").unwrap_or(db.database),
            ssl_mode: lookup("DB_SSLMODE").unwrap_or(db.ssl_mode),
            max_connections: parse(&lookup, "DB_MAX_CONNECTIONS", db.max_connections)?,
            acquire_timeout: db.acquire_timeout,
        };

        let redis = RedisConfig {
            host: lookup("REDIS_HOST").unwrap_or(redis.host),
            port: parse(&lookup, "REDIS_PORT", redis.port)?,
            password: lookup("REDIS_PASSWORD").filter(|p| !p.is_empty()),
            db: parse(&lookup, "REDIS_DB", redis.db)?,
        };

        let coordinator = CoordinatorConfig::new(
            Duration::from_millis(parse(
                &lookup,
                "STORE_TIMEOUT_MS",
                millis(defaults.coordinator.store_timeout),
            )?),
            Duration::from_millis(parse(
                &lookup,
                "CACHE_TIMEOUT_MS",
                millis(defaults.coordinator.cache_timeout),
            )?),
        );

        let log_format = match lookup("LOG_FORMAT") {
            Some(format) if format.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse(&lookup, "PORT", defaults.port)?,
            database,
            redis,
            cache_ttl: Duration::from_secs(parse(
                &lookup,
                "CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )?),
            coordinator,
            run_migrations: parse(&lookup, "RUN_MIGRATIONS", defaults.run_migrations)?,
            log_format,
        })
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
            port: 8081,
            database: DatabaseConfig::default(),
            redis: RedisConfig::default(),
            cache_ttl: delivery_cache::DEFAULT_TTL,
            coordinator: CoordinatorConfig::default(),
            run_migrations: true,
            log_format: LogFormat::Text,
        }
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError { name, value }),
        None => Ok(default),
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
