//! Daemon configuration from `SWAPMEET_*` environment variables.
//!
//! A `.env` file in the working directory is loaded first when present.
//! Every variable is optional; unset ones fall back to [`Config::default`].

use crate::error::{DaemonError, DaemonResult};
use std::env;
use std::fmt;
use std::str::FromStr;
use swapmeet_store::DEFAULT_MAX_ATTEMPTS;

const DEFAULT_BUS_CAPACITY: usize = 1000;

// =============================================================================
// Configuration
// =============================================================================

/// Everything the daemon needs to start.
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub transactions: TransactionConfig,
    pub notifications: NotificationConfig,

    /// `SWAPMEET_DATABASE_URL`; when set the daemon runs against Postgres
    #[cfg(feature = "postgres")]
    pub database_url: Option<String>,

    pub environment: Environment,
}

/// Listen address for the HTTP API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    /// 0 lets the OS pick
    pub port: u16,
}

/// Optimistic transaction settings.
#[derive(Debug, Clone)]
pub struct TransactionConfig {
    /// Runs of a transaction body before a commit conflict is reported
    pub max_attempts: u32,
}

/// Post-commit notification settings.
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    /// Write in-app list entries alongside push notifications
    pub in_app: bool,
    /// Events buffered per bus subscriber
    pub bus_capacity: usize,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Test,
    Development,
    Production,
}

impl Config {
    /// Read the environment (and `.env`), validating every value.
    pub fn from_env() -> DaemonResult<Self> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        let environment = match env::var("SWAPMEET_ENV") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.environment,
        };

        let api = ApiConfig {
            host: env::var("SWAPMEET_API_HOST").unwrap_or(defaults.api.host),
            port: parse_var("SWAPMEET_API_PORT", defaults.api.port)?,
        };

        let max_attempts = parse_var("SWAPMEET_TX_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?;
        let bus_capacity = parse_var("SWAPMEET_EVENT_BUS_CAPACITY", DEFAULT_BUS_CAPACITY)?;
        if max_attempts == 0 || bus_capacity == 0 {
            return Err(DaemonError::Config(
                "SWAPMEET_TX_MAX_ATTEMPTS and SWAPMEET_EVENT_BUS_CAPACITY must be positive"
                    .to_string(),
            ));
        }

        Ok(Self {
            api,
            transactions: TransactionConfig { max_attempts },
            notifications: NotificationConfig {
                in_app: parse_var("SWAPMEET_IN_APP_NOTIFICATIONS", true)?,
                bus_capacity,
            },
            #[cfg(feature = "postgres")]
            database_url: env::var("SWAPMEET_DATABASE_URL").ok(),
            environment,
        })
    }

    /// Loopback on an OS-assigned port, in-memory store, small bus.
    pub fn test() -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            notifications: NotificationConfig {
                in_app: true,
                bus_capacity: 100,
            },
            environment: Environment::Test,
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            transactions: TransactionConfig {
                max_attempts: DEFAULT_MAX_ATTEMPTS,
            },
            notifications: NotificationConfig {
                in_app: true,
                bus_capacity: DEFAULT_BUS_CAPACITY,
            },
            #[cfg(feature = "postgres")]
            database_url: None,
            environment: Environment::Development,
        }
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> DaemonResult<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| DaemonError::Config(format!("Invalid {}: {:?}", key, raw))),
        Err(_) => Ok(default),
    }
}

impl FromStr for Environment {
    type Err = DaemonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(DaemonError::Config(format!(
                "Invalid SWAPMEET_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Environment::Test => "test",
            Environment::Development => "development",
            Environment::Production => "production",
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
