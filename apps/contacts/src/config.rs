use std::env;
use std::net::SocketAddr;

use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:4567";
const DEFAULT_LOG_FILTER: &str = "info";
const DEFAULT_LOG_FORMAT: &str = "text";
const DEFAULT_STORE_DRIVER: &str = "session";
const DEFAULT_SESSION_TTL_SECONDS: u64 = 86_400;
const DEFAULT_MAX_SESSIONS: usize = 10_000;
const DEFAULT_CATEGORIES: &str = "family,friends,work";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreDriver {
    Session,
    Postgres,
}

impl StoreDriver {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "session" => Ok(Self::Session),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(ConfigError::InvalidStoreDriver(other.to_string())),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Postgres => "postgres",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub log_filter: String,
    pub log_format: LogFormat,
    pub store_driver: StoreDriver,
    pub db_url: Option<String>,
    pub session_ttl_seconds: u64,
    pub max_sessions: usize,
    pub categories: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid CONTACTS_BIND_ADDR '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("invalid CONTACTS_LOG_FORMAT: {0}")]
    InvalidLogFormat(String),
    #[error("invalid CONTACTS_STORE_DRIVER: {0}")]
    InvalidStoreDriver(String),
    #[error("invalid CONTACTS_SESSION_TTL_SECONDS: {0}")]
    InvalidSessionTtlSeconds(String),
    #[error("invalid CONTACTS_MAX_SESSIONS: {0}")]
    InvalidMaxSessions(String),
    #[error("postgres store requires DB_URL or DATABASE_URL")]
    MissingDatabaseUrl,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr_raw = non_empty_env("CONTACTS_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = parse_bind_addr(&bind_addr_raw)?;

        let log_filter =
            non_empty_env("CONTACTS_LOG_FILTER").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        let log_format = parse_log_format(
            &non_empty_env("CONTACTS_LOG_FORMAT").unwrap_or_else(|| DEFAULT_LOG_FORMAT.to_string()),
        )?;

        let store_driver = StoreDriver::parse(
            &non_empty_env("CONTACTS_STORE_DRIVER")
                .unwrap_or_else(|| DEFAULT_STORE_DRIVER.to_string()),
        )?;
        let db_url = non_empty_env("DB_URL").or_else(|| non_empty_env("DATABASE_URL"));

        let session_ttl_seconds = non_empty_env("CONTACTS_SESSION_TTL_SECONDS")
            .map(|value| {
                value
                    .parse::<u64>()
                    .map_err(|error| ConfigError::InvalidSessionTtlSeconds(error.to_string()))
            })
            .transpose()?
            .unwrap_or(DEFAULT_SESSION_TTL_SECONDS)
            .max(1);
        let max_sessions = non_empty_env("CONTACTS_MAX_SESSIONS")
            .map(|value| parse_max_sessions(&value))
            .transpose()?
            .unwrap_or(DEFAULT_MAX_SESSIONS);

        let categories = parse_categories(
            &non_empty_env("CONTACTS_CATEGORIES").unwrap_or_else(|| DEFAULT_CATEGORIES.to_string()),
        );

        let config = Self {
            bind_addr,
            log_filter,
            log_format,
            store_driver,
            db_url,
            session_ttl_seconds,
            max_sessions,
            categories,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_driver == StoreDriver::Postgres && self.db_url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        Ok(())
    }

    pub fn for_tests() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            log_filter: "debug".to_string(),
            log_format: LogFormat::Text,
            store_driver: StoreDriver::Session,
            db_url: None,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            max_sessions: DEFAULT_MAX_SESSIONS,
            categories: parse_categories(DEFAULT_CATEGORIES),
        }
    }
}

pub fn parse_bind_addr(value: &str) -> Result<SocketAddr, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|source| ConfigError::InvalidBindAddr {
            value: value.to_string(),
            source,
        })
}

fn parse_log_format(value: &str) -> Result<LogFormat, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "text" | "pretty" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        other => Err(ConfigError::InvalidLogFormat(other.to_string())),
    }
}

fn parse_max_sessions(value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err(ConfigError::InvalidMaxSessions("must be at least 1".to_string())),
        Ok(max) => Ok(max),
        Err(error) => Err(ConfigError::InvalidMaxSessions(error.to_string())),
    }
}

fn parse_categories(raw: &str) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();
    for value in raw.split(',').map(str::trim) {
        if value.is_empty() || categories.iter().any(|existing| existing == value) {
            continue;
        }
        categories.push(value.to_string());
    }
    categories
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
