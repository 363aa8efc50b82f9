//! # Chairside API Server
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  .env / environment ──► ApiConfig                                       │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  tracing subscriber (EnvFilter, text or JSON)                           │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Database::new (WAL, migrations) ──► AppState ──► axum::serve           │
//! │                                                        │                │
//! │                                    Ctrl+C / SIGTERM ───┘ graceful stop  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chairside_api::{build_router, ApiConfig, AppState, JwtManager};
use chairside_db::{Database, DbConfig};

const DEFAULT_LOG_FILTER: &str = "info,chairside=debug,sqlx=warn";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ApiConfig::load()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    if config.log_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!("Starting Chairside API server...");
    info!(
        port = config.port,
        db_path = %config.db_path,
        max_connections = config.db_max_connections,
        "Configuration loaded"
    );

    // Connect to database (runs migrations)
    let db = Database::new(
        DbConfig::new(&config.db_path).max_connections(config.db_max_connections),
    )
    .await
    .context("failed to open database")?;
    info!("Database ready");

    let jwt = JwtManager::new(config.jwt_secret.clone(), config.jwt_access_lifetime_secs);
    let app = build_router(AppState::new(db.clone(), jwt));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
