use std::env;
use std::time::Duration;

use crate::health::ReadinessPolicy;

pub const DEFAULT_DB_PORT: &str = "3306";
pub const DEFAULT_CONNECTION_LIMIT: u32 = 10;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub log_level: String,
    pub readiness: ReadinessPolicy,
    pub db: PoolConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self::resolve(|key| env::var(key).ok())
    }

    pub fn resolve<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("PORT")
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8080);
        let environment = non_empty(&lookup, "ENVIRONMENT").unwrap_or_else(|| "development".into());
        let log_level = non_empty(&lookup, "LOG_LEVEL").unwrap_or_else(|| "info".into());
        let readiness = match non_empty(&lookup, "READINESS_REQUIRE_DATABASE").as_deref() {
            Some("1") | Some("true") | Some("yes") => ReadinessPolicy::RequireDatabase,
            _ => ReadinessPolicy::Lenient,
        };

        Self {
            port,
            environment,
            log_level,
            readiness,
            db: PoolConfig::resolve(lookup),
        }
    }
}

/// Connection parameters for the backend pool.
///
/// `port` stays the raw environment string; a malformed value is reported by
/// the pool on first use rather than here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    pub host: Option<String>,
    pub port: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub max_connections: u32,
    pub queue_unbounded: bool,
    pub acquire_timeout: Duration,
    pub query_timeout: Duration,
}

impl PoolConfig {
    pub fn resolve<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let secs = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|v| *v > 0)
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(default))
        };

        Self {
            host: non_empty(&lookup, "DB_HOST"),
            port: non_empty(&lookup, "DB_PORT").unwrap_or_else(|| DEFAULT_DB_PORT.into()),
            user: non_empty(&lookup, "DB_USERNAME"),
            password: non_empty(&lookup, "DB_PASSWORD"),
            database: non_empty(&lookup, "DB_NAME"),
            max_connections: lookup("DB_CONNECTION_LIMIT")
                .and_then(|v| v.trim().parse::<u32>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_CONNECTION_LIMIT),
            queue_unbounded: true,
            acquire_timeout: secs("DB_ACQUIRE_TIMEOUT_SECS", DEFAULT_ACQUIRE_TIMEOUT_SECS),
            query_timeout: secs("DB_QUERY_TIMEOUT_SECS", DEFAULT_QUERY_TIMEOUT_SECS),
        }
    }

    /// Host, user and database must all be present for a pool to exist.
    pub fn is_usable(&self) -> bool {
        self.host.is_some() && self.user.is_some() && self.database.is_some()
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}
