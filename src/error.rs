use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use sqlx::mysql::MySqlDatabaseError;
use thiserror::Error;

/// Failure of a single pool operation. Never retried.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("invalid database configuration: {0}")]
    InvalidConfig(String),

    #[error("database operation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("write probe read back {found:?}, expected {expected:?}")]
    ProbeMismatch {
        expected: String,
        found: Option<String>,
    },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DbError {
    /// Backend SQLSTATE when the server answered, otherwise a transport-level
    /// classification.
    pub fn code(&self) -> Option<String> {
        match self {
            DbError::InvalidConfig(_) => Some("INVALID_CONFIG".into()),
            DbError::Timeout(_) => Some("TIMEOUT".into()),
            DbError::ProbeMismatch { .. } => Some("PROBE_MISMATCH".into()),
            DbError::Sqlx(e) => match e {
                sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
                sqlx::Error::Io(io) => Some(format!("{:?}", io.kind())),
                sqlx::Error::Tls(_) => Some("TLS".into()),
                sqlx::Error::Configuration(_) => Some("INVALID_CONFIG".into()),
                sqlx::Error::PoolTimedOut => Some("POOL_TIMED_OUT".into()),
                sqlx::Error::PoolClosed => Some("POOL_CLOSED".into()),
                sqlx::Error::RowNotFound => Some("ROW_NOT_FOUND".into()),
                sqlx::Error::Protocol(_) => Some("PROTOCOL".into()),
                _ => None,
            },
        }
    }

    /// MySQL error number, only present for errors reported by the server.
    pub fn errno(&self) -> Option<u16> {
        match self {
            DbError::Sqlx(sqlx::Error::Database(db)) => db
                .try_downcast_ref::<MySqlDatabaseError>()
                .map(MySqlDatabaseError::number),
            _ => None,
        }
    }
}

/// Handler-level failures for the database endpoints.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database not configured")]
    NotConfigured(serde_json::Value),

    #[error("{context}: {source}")]
    Db {
        context: &'static str,
        details: serde_json::Value,
        #[source]
        source: DbError,
    },
}

impl AppError {
    pub fn db(context: &'static str, source: DbError) -> Self {
        AppError::Db {
            context,
            details: serde_json::Value::Null,
            source,
        }
    }

    /// Extra fields merged into the error body.
    pub fn with_details(self, extra: serde_json::Value) -> Self {
        match self {
            AppError::Db {
                context, source, ..
            } => AppError::Db {
                context,
                details: extra,
                source,
            },
            other => other,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotConfigured(extra) => {
                let mut body = json!({ "error": "Database not configured" });
                merge(&mut body, extra);
                (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
            }
            AppError::Db {
                context,
                details,
                source,
            } => {
                let mut body = json!({
                    "error": context,
                    "message": source.to_string(),
                });
                merge(&mut body, details);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

fn merge(body: &mut serde_json::Value, extra: serde_json::Value) {
    if let (Some(body), serde_json::Value::Object(extra)) = (body.as_object_mut(), extra) {
        body.extend(extra);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_classified() {
        let refused = DbError::from(sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )));
        assert_eq!(refused.code().as_deref(), Some("ConnectionRefused"));
        assert_eq!(refused.errno(), None);

        assert_eq!(
            DbError::from(sqlx::Error::PoolClosed).code().as_deref(),
            Some("POOL_CLOSED")
        );
        assert_eq!(
            DbError::Timeout(Duration::from_secs(3)).to_string(),
            "database operation timed out after 3s"
        );
    }

    #[tokio::test]
    async fn not_configured_maps_to_503_with_details() {
        let resp = AppError::NotConfigured(json!({ "config": { "host": "not set" } }))
            .into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "Database not configured");
        assert_eq!(body["config"]["host"], "not set");
    }

    #[tokio::test]
    async fn db_failure_maps_to_500_with_message() {
        let resp = AppError::db(
            "Database write test failed",
            DbError::InvalidConfig("bad port".into()),
        )
        .with_details(json!({ "code": "INVALID_CONFIG" }))
        .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "Database write test failed");
        assert_eq!(body["message"], "invalid database configuration: bad port");
        assert_eq!(body["code"], "INVALID_CONFIG");
    }
}
