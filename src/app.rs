use crate::config::Config;
use crate::db::mysql::Pool;
use crate::routes::database::{db_test, write_test};
use crate::routes::health::{health, ready};
use crate::routes::info::{info, root};
use axum::{
    extract::Request,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::any::Any;
use std::time::Instant;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Per-process state handed to every handler. The pool is `None` when the
/// database is not configured.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub db: Option<Pool>,
    pub started: Instant,
}

pub fn build_router(state: AppState) -> Router {
    let environment = state.cfg.environment.clone();

    Router::new()
        // Known paths with the wrong method answer like unknown paths.
        .route("/", get(root).fallback(not_found))
        .route("/health", get(health).fallback(not_found))
        .route("/ready", get(ready).fallback(not_found))
        .route("/info", get(info).fallback(not_found))
        .route("/db/test", get(db_test).fallback(not_found))
        .route("/db/write-test", post(write_test).fallback(not_found))
        .fallback(not_found)
        .layer(CatchPanicLayer::custom({
            let environment = environment.clone();
            move |err: Box<dyn Any + Send + 'static>| panic_response(err, &environment)
        }))
        .layer(
            TraceLayer::new_for_http().make_span_with(move |req: &Request| {
                tracing::info_span!(
                    "request",
                    environment = %environment,
                    method = %req.method(),
                    path = %req.uri().path(),
                )
            }),
        )
        .with_state(state)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not found", "path": uri.path() })),
    )
}

// The panic message is returned to the client as-is.
fn panic_response(err: Box<dyn Any + Send + 'static>, environment: &str) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(error = %message, environment, "Unhandled error");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error", "message": message })),
    )
        .into_response()
}
