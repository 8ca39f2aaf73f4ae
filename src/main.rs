use axum::Router;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::signal;
use tracing::{error, info, warn};
mod app;
mod config;
mod db;
mod diagnostics;
mod error;
mod health;
mod logging;
mod models;
mod routes;

use db::mysql::Pool;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let started = Instant::now();

    // Load configuration
    dotenvy::dotenv().ok();
    let cfg = config::Config::from_env();

    // Initialize logging
    logging::init(&cfg.log_level);
    info!(port = cfg.port, environment = %cfg.environment, "Starting probe service");

    // Create DB pool; connections are opened on first use
    let db = Pool::open(&cfg.db);
    match &db {
        Some(pool) => {
            info!(
                host = cfg.db.host.as_deref(),
                database = cfg.db.database.as_deref(),
                max_connections = cfg.db.max_connections,
                queue_unbounded = cfg.db.queue_unbounded,
                environment = %cfg.environment,
                "Database connection pool created"
            );
            tokio::spawn(verify_connection(pool.clone(), cfg.clone()));
        }
        None => warn!(
            host_provided = cfg.db.host.is_some(),
            user_provided = cfg.db.user.is_some(),
            database_provided = cfg.db.database.is_some(),
            environment = %cfg.environment,
            "Database not configured - running without database connection"
        ),
    }

    let app: Router = app::build_router(app::AppState {
        cfg: cfg.clone(),
        db: db.clone(),
        started,
    });

    // Bind address
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        %addr,
        environment = %cfg.environment,
        database_configured = db.is_some(),
        "Server started"
    );

    // Server with graceful shutdown
    let server = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal(cfg.environment.clone()));

    if let Err(e) = server.await {
        error!(error = %e, "Server error");
    }

    if let Some(pool) = &db {
        pool.close().await;
        info!(environment = %cfg.environment, "Database connections closed");
    }

    info!(environment = %cfg.environment, "Shutdown complete");
    Ok(())
}

/// Logs the outcome of a first round trip. Readiness never waits on this.
async fn verify_connection(pool: Pool, cfg: config::Config) {
    match diagnostics::server_metadata(&pool).await {
        Ok(meta) => info!(
            host = cfg.db.host.as_deref(),
            database = cfg.db.database.as_deref(),
            version = %meta.version,
            current_db = meta.current_db.as_deref(),
            server_time = %meta.current_time,
            environment = %cfg.environment,
            "Database connection verified"
        ),
        Err(e) => error!(
            host = cfg.db.host.as_deref(),
            database = cfg.db.database.as_deref(),
            error = %e,
            environment = %cfg.environment,
            "Failed to verify database connection on startup"
        ),
    }
}

async fn shutdown_signal(environment: String) {
    let name = wait_for_signal().await;
    info!(signal = name, environment = %environment, "Signal received, shutting down gracefully");

    // A second signal skips the drain.
    tokio::spawn(async {
        let name = wait_for_signal().await;
        warn!(signal = name, "Second signal received, exiting immediately");
        std::process::exit(1);
    });
}

async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
