use crate::app::AppState;
use crate::health::{liveness, readiness};
use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde_json::json;
use tracing::error;

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let live = liveness(state.started);
    (
        StatusCode::OK,
        Json(json!({
            "status": live.status,
            "timestamp": Utc::now().to_rfc3339(),
            "environment": state.cfg.environment,
            "uptime": live.uptime,
        })),
    )
}

pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let checks = readiness(state.db.as_ref(), state.cfg.readiness).await;
    if let Some(e) = &checks.database_error {
        let code = e.code();
        error!(
            error = %e,
            code = code.as_deref(),
            environment = %state.cfg.environment,
            "Database check failed"
        );
    }

    let (code, status) = if checks.ready() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    };

    (
        code,
        Json(json!({
            "status": status,
            "timestamp": Utc::now().to_rfc3339(),
            "checks": checks,
        })),
    )
}
