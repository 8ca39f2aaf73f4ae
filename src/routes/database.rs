use crate::app::AppState;
use crate::diagnostics;
use crate::error::AppError;
use crate::models::probe::ConnectionTarget;
use axum::{extract::State, Json};
use serde_json::json;
use tracing::error;

pub async fn db_test(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let target = ConnectionTarget::from_config(&state.cfg.db);
    let Some(pool) = state.db.as_ref() else {
        return Err(AppError::NotConfigured(json!({ "config": target })));
    };

    match diagnostics::report(pool).await {
        Ok(report) => Ok(Json(json!({
            "status": "connected",
            "message": "Database connection successful",
            "connection": target,
            "server": report.server,
            "tables_count": report.tables_count,
            "tables": report.tables,
            "connections": report.connections,
        }))),
        Err(e) => {
            let code = e.code();
            let errno = e.errno();
            error!(
                error = %e,
                code = code.as_deref(),
                errno,
                environment = %state.cfg.environment,
                "Database test failed"
            );
            Err(AppError::db("Database connection failed", e).with_details(json!({
                "code": code,
                "errno": errno,
                "config": target,
            })))
        }
    }
}

pub async fn write_test(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let Some(pool) = state.db.as_ref() else {
        return Err(AppError::NotConfigured(serde_json::Value::Null));
    };

    let probe = diagnostics::write_probe(pool).await.map_err(|e| {
        error!(
            error = %e,
            environment = %state.cfg.environment,
            "Database write test failed"
        );
        AppError::db("Database write test failed", e)
    })?;

    Ok(Json(json!({
        "status": "success",
        "message": "Database write test successful",
        "test": probe,
    })))
}
