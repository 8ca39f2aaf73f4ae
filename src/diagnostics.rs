//! Read-only and read-write probes against the pool.
//!
//! Each probe is all-or-nothing: the first failing statement fails the whole
//! run and no partial report is produced.

use sqlx::Row;
use uuid::Uuid;

use crate::db::mysql::{Param, Pool};
use crate::error::DbError;
use crate::models::probe::{
    DiagnosticReport, ServerMetadata, StatusVariable, WriteProbe, WriteProbeRecord,
};

pub async fn report(pool: &Pool) -> Result<DiagnosticReport, DbError> {
    let basic = pool.fetch("SELECT 1 AS test", &[]).await?;
    if basic.is_empty() {
        return Err(sqlx::Error::RowNotFound.into());
    }

    let server = server_metadata(pool).await?;
    let tables = list_tables(pool).await?;
    let connections = threads_connected(pool).await?;

    Ok(DiagnosticReport {
        server,
        tables_count: tables.len(),
        tables,
        connections,
    })
}

pub async fn server_metadata(pool: &Pool) -> Result<ServerMetadata, DbError> {
    let rows = pool
        .fetch(
            "SELECT CAST(VERSION() AS CHAR) AS version, NOW() AS server_time, \
             CAST(DATABASE() AS CHAR) AS current_db, CAST(USER() AS CHAR) AS db_user",
            &[],
        )
        .await?;
    let row = rows.first().ok_or(sqlx::Error::RowNotFound)?;

    Ok(ServerMetadata {
        version: row.try_get("version")?,
        current_time: row.try_get("server_time")?,
        current_db: row.try_get("current_db")?,
        current_user: row.try_get("db_user")?,
    })
}

async fn list_tables(pool: &Pool) -> Result<Vec<String>, DbError> {
    let rows = pool
        .fetch(
            "SELECT CAST(table_name AS CHAR) AS name FROM information_schema.tables \
             WHERE table_schema = DATABASE() ORDER BY name",
            &[],
        )
        .await?;
    rows.iter()
        .map(|r| r.try_get::<String, _>("name").map_err(DbError::from))
        .collect()
}

async fn threads_connected(pool: &Pool) -> Result<Option<StatusVariable>, DbError> {
    let rows = pool
        .fetch("SHOW STATUS LIKE 'Threads_connected'", &[])
        .await?;
    let Some(row) = rows.first() else {
        return Ok(None);
    };
    // SHOW output column types vary by server version.
    Ok(Some(StatusVariable {
        name: row.try_get_unchecked(0)?,
        value: row.try_get_unchecked(1)?,
    }))
}

/// Creates the probe table if needed, inserts a fresh token and reads it back
/// by the generated id. Rows are never cleaned up.
pub async fn write_probe(pool: &Pool) -> Result<WriteProbe, DbError> {
    pool.execute(
        "CREATE TABLE IF NOT EXISTS test_connection (\
            id INT AUTO_INCREMENT PRIMARY KEY, \
            test_value VARCHAR(255), \
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP\
         )",
        &[],
    )
    .await?;

    let token = probe_token();
    let inserted = pool
        .execute(
            "INSERT INTO test_connection (test_value) VALUES (?)",
            &[Param::Text(token.clone())],
        )
        .await?;
    let inserted_id = inserted.last_insert_id();

    let rows = pool
        .fetch(
            "SELECT id, test_value, created_at FROM test_connection WHERE id = ?",
            &[Param::Id(inserted_id)],
        )
        .await?;
    let row = rows.first().ok_or(sqlx::Error::RowNotFound)?;
    let record = WriteProbeRecord {
        id: row.try_get("id")?,
        test_value: row.try_get("test_value")?,
        created_at: row.try_get("created_at")?,
    };

    confirm_round_trip(inserted_id, token, record)
}

/// The row read back must carry exactly the token that was written.
fn confirm_round_trip(
    inserted_id: u64,
    token: String,
    record: WriteProbeRecord,
) -> Result<WriteProbe, DbError> {
    if record.test_value.as_deref() != Some(token.as_str()) {
        return Err(DbError::ProbeMismatch {
            expected: token,
            found: record.test_value,
        });
    }

    Ok(WriteProbe {
        inserted_id,
        test_value: token,
        retrieved_data: record,
    })
}

fn probe_token() -> String {
    format!("test-{}", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crate::db::mysql::tests::unreachable_config;
    use crate::error::AppError;

    #[test]
    fn tokens_are_distinct() {
        let a = probe_token();
        let b = probe_token();
        assert!(a.starts_with("test-"));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn report_fails_whole_when_backend_unreachable() {
        let pool = Pool::open(&unreachable_config()).unwrap();
        let err = report(&pool).await.unwrap_err();
        assert!(err.code().is_some());
    }

    #[tokio::test]
    async fn write_probe_fails_on_closed_pool() {
        let pool = Pool::open(&unreachable_config()).unwrap();
        pool.close().await;
        let err = write_probe(&pool).await.unwrap_err();
        assert_eq!(err.code().as_deref(), Some("POOL_CLOSED"));
    }

    fn record(id: i32, value: Option<&str>) -> WriteProbeRecord {
        WriteProbeRecord {
            id,
            test_value: value.map(Into::into),
            created_at: None,
        }
    }

    #[test]
    fn matching_read_back_is_accepted() {
        let token = probe_token();
        let probe = confirm_round_trip(7, token.clone(), record(7, Some(&token))).unwrap();
        assert_eq!(probe.inserted_id, 7);
        assert_eq!(probe.test_value, token);
        assert_eq!(probe.retrieved_data.test_value.as_deref(), Some(token.as_str()));
    }

    #[test]
    fn differing_read_back_is_a_mismatch() {
        for stored in [Some("test-other"), None] {
            let err = confirm_round_trip(7, "test-mine".into(), record(7, stored)).unwrap_err();
            assert_eq!(err.code().as_deref(), Some("PROBE_MISMATCH"));
            assert!(matches!(
                &err,
                DbError::ProbeMismatch { expected, found }
                    if expected == "test-mine" && found.as_deref() == stored
            ));
        }
    }

    #[tokio::test]
    async fn mismatch_maps_to_500() {
        use axum::http::StatusCode;
        use axum::response::IntoResponse;

        let err = confirm_round_trip(1, "test-mine".into(), record(1, Some("test-other")))
            .unwrap_err();
        let resp = AppError::db("Database write test failed", err).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "Database write test failed");
        assert!(body["message"].as_str().unwrap().contains("test-mine"));
    }

    fn live_pool() -> Pool {
        let cfg = PoolConfig::resolve(|k| std::env::var(k).ok());
        Pool::open(&cfg).expect("DB_HOST, DB_USERNAME and DB_NAME must be set")
    }

    #[tokio::test]
    #[ignore = "requires a reachable MySQL server configured via DB_* variables"]
    async fn live_report_lists_server_metadata() {
        let pool = live_pool();
        let report = report(&pool).await.unwrap();
        assert!(!report.server.version.is_empty());
        assert_eq!(report.tables_count, report.tables.len());
        pool.close().await;
    }

    #[tokio::test]
    #[ignore = "requires a reachable MySQL server configured via DB_* variables"]
    async fn live_write_probe_creates_distinct_rows() {
        let pool = live_pool();
        let first = write_probe(&pool).await.unwrap();
        let second = write_probe(&pool).await.unwrap();

        assert_ne!(first.inserted_id, second.inserted_id);
        assert_ne!(first.test_value, second.test_value);
        assert_eq!(
            first.retrieved_data.test_value.as_deref(),
            Some(first.test_value.as_str())
        );
        assert_eq!(second.retrieved_data.id as u64, second.inserted_id);
        pool.close().await;
    }
}
