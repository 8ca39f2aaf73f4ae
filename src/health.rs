//! Liveness and readiness evaluation.
//!
//! Liveness never touches the database. Readiness re-probes the pool on every
//! call; nothing is cached between requests.

use std::time::Instant;

use serde::Serialize;

use crate::db::mysql::Pool;
use crate::error::DbError;

/// How readiness treats a process started without database settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessPolicy {
    /// No configured database counts as a satisfied check.
    Lenient,
    /// No configured database means not ready.
    RequireDatabase,
}

#[derive(Debug, Serialize)]
pub struct Readiness {
    pub server: bool,
    pub database: bool,
    /// Why the database check failed; left to the caller to log.
    #[serde(skip)]
    pub database_error: Option<DbError>,
}

impl Readiness {
    pub fn ready(&self) -> bool {
        self.server && self.database
    }
}

#[derive(Debug, Clone)]
pub struct Liveness {
    pub status: &'static str,
    pub uptime: f64,
}

pub fn liveness(started: Instant) -> Liveness {
    Liveness {
        status: "healthy",
        uptime: started.elapsed().as_secs_f64(),
    }
}

/// The probe is bounded by the pool's acquire and query timeouts, so this
/// always completes.
pub async fn readiness(db: Option<&Pool>, policy: ReadinessPolicy) -> Readiness {
    let (database, database_error) = match db {
        Some(pool) => match pool.probe().await {
            Ok(()) => (true, None),
            Err(e) => (false, Some(e)),
        },
        None => (policy == ReadinessPolicy::Lenient, None),
    };

    Readiness {
        server: true,
        database,
        database_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mysql::tests::unreachable_config;

    #[tokio::test]
    async fn absent_database_is_ready_under_lenient_policy() {
        let r = readiness(None, ReadinessPolicy::Lenient).await;
        assert!(r.database);
        assert!(r.ready());
        assert!(r.database_error.is_none());
    }

    #[tokio::test]
    async fn absent_database_is_not_ready_when_required() {
        let r = readiness(None, ReadinessPolicy::RequireDatabase).await;
        assert!(r.server);
        assert!(!r.database);
        assert!(!r.ready());
    }

    #[tokio::test]
    async fn unreachable_database_is_not_ready() {
        let pool = Pool::open(&unreachable_config()).unwrap();
        for policy in [ReadinessPolicy::Lenient, ReadinessPolicy::RequireDatabase] {
            let r = readiness(Some(&pool), policy).await;
            assert!(!r.database);
            assert!(!r.ready());
            assert!(r.database_error.is_some());
        }
    }

    #[test]
    fn liveness_reports_elapsed_uptime() {
        let started = Instant::now() - std::time::Duration::from_secs(2);
        let live = liveness(started);
        assert_eq!(live.status, "healthy");
        assert!(live.uptime >= 2.0);
    }
}
