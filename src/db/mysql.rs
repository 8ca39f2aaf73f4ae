use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sqlx::mysql::{
    MySqlArguments, MySqlConnectOptions, MySqlPoolOptions, MySqlQueryResult, MySqlRow,
};
use sqlx::query::Query;
use sqlx::{MySql, MySqlPool};
use tracing::debug;

use crate::config::PoolConfig;
use crate::error::DbError;

/// Positional statement parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Text(String),
    Id(u64),
}

#[derive(Clone)]
enum Backend {
    Live(MySqlPool),
    /// Config passed presence checks but could not be turned into connect
    /// options; every operation reports this reason.
    Invalid(Arc<str>),
}

/// Shared handle to the process-wide connection pool.
///
/// Connections are established lazily on first checkout. Clones share the
/// same underlying pool, so closing any clone closes it for all.
#[derive(Clone)]
pub struct Pool {
    backend: Backend,
    query_timeout: Duration,
}

impl Pool {
    /// Returns `None` when the config lacks host, user or database. Performs
    /// no network I/O; must be called inside a Tokio runtime.
    pub fn open(cfg: &PoolConfig) -> Option<Pool> {
        if !cfg.is_usable() {
            return None;
        }

        let backend = match connect_options(cfg) {
            Ok(options) => Backend::Live(
                MySqlPoolOptions::new()
                    .max_connections(cfg.max_connections)
                    .acquire_timeout(cfg.acquire_timeout)
                    .connect_lazy_with(options),
            ),
            Err(reason) => Backend::Invalid(reason.into()),
        };

        Some(Pool {
            backend,
            query_timeout: cfg.query_timeout,
        })
    }

    /// Single `SELECT 1` round trip.
    pub async fn probe(&self) -> Result<(), DbError> {
        self.fetch("SELECT 1", &[]).await.map(|_| ())
    }

    pub async fn fetch(&self, sql: &str, params: &[Param]) -> Result<Vec<MySqlRow>, DbError> {
        let pool = self.live()?;
        debug!(sql, params = params.len(), "fetch");
        self.bounded(bind_all(sql, params).fetch_all(pool)).await
    }

    pub async fn execute(&self, sql: &str, params: &[Param]) -> Result<MySqlQueryResult, DbError> {
        let pool = self.live()?;
        debug!(sql, params = params.len(), "execute");
        self.bounded(bind_all(sql, params).execute(pool)).await
    }

    /// Waits for checked-out connections to return, then closes them all.
    /// Safe to call more than once; later operations fail with `PoolClosed`.
    pub async fn close(&self) {
        if let Backend::Live(pool) = &self.backend {
            pool.close().await;
        }
    }

    pub fn is_closed(&self) -> bool {
        match &self.backend {
            Backend::Live(pool) => pool.is_closed(),
            Backend::Invalid(_) => false,
        }
    }

    /// Open connections, idle or checked out.
    pub fn size(&self) -> u32 {
        match &self.backend {
            Backend::Live(pool) => pool.size(),
            Backend::Invalid(_) => 0,
        }
    }

    pub fn idle(&self) -> usize {
        match &self.backend {
            Backend::Live(pool) => pool.num_idle(),
            Backend::Invalid(_) => 0,
        }
    }

    fn live(&self) -> Result<&MySqlPool, DbError> {
        match &self.backend {
            Backend::Live(pool) => Ok(pool),
            Backend::Invalid(reason) => Err(DbError::InvalidConfig(reason.to_string())),
        }
    }

    /// Dropping the timed-out future cancels the in-flight backend call.
    async fn bounded<T, F>(&self, fut: F) -> Result<T, DbError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(res) => res.map_err(DbError::from),
            Err(_) => Err(DbError::Timeout(self.query_timeout)),
        }
    }
}

fn connect_options(cfg: &PoolConfig) -> Result<MySqlConnectOptions, String> {
    let port = cfg
        .port
        .trim()
        .parse::<u16>()
        .map_err(|e| format!("DB_PORT {:?} is not a valid port: {e}", cfg.port))?;

    let mut options = MySqlConnectOptions::new()
        .host(cfg.host.as_deref().unwrap_or_default())
        .port(port)
        .username(cfg.user.as_deref().unwrap_or_default())
        .database(cfg.database.as_deref().unwrap_or_default());
    if let Some(password) = cfg.password.as_deref() {
        options = options.password(password);
    }
    Ok(options)
}

fn bind_all<'q>(sql: &'q str, params: &'q [Param]) -> Query<'q, MySql, MySqlArguments> {
    params.iter().fold(sqlx::query(sql), |q, p| match p {
        Param::Text(s) => q.bind(s.as_str()),
        Param::Id(id) => q.bind(*id),
    })
}
