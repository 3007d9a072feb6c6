//! ClaimDesk RS Server
//!
//! HTTP server for the ClaimDesk authentication core.

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cm_api::AppState;
use cm_auth::{AccessTokenCodec, AuthService, HashParams, PasswordService};
use cm_core::config::AppConfig;
use cm_db::{Database, DatabaseConfig, PgRefreshTokenRepository, PgUserRepository};

mod health;

use health::HealthChecker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize structured logging
    init_tracing();

    let config = AppConfig::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.environment,
        host = %config.server.host,
        port = config.server.port,
        "Starting ClaimDesk RS"
    );

    // Connect to database
    let db_config = DatabaseConfig::with_url(&config.database.url)
        .with_max_connections(config.database.pool_size);
    let db = Database::connect(&db_config).await?;
    db.migrate().await?;
    info!("Connected to database");

    // Auth services share one hasher and one codec
    let passwords = Arc::new(PasswordService::new(HashParams::from(&config.auth))?);
    let codec = Arc::new(AccessTokenCodec::new(config.auth.jwt_secret.as_bytes()));
    let auth = Arc::new(AuthService::new(
        Arc::new(PgUserRepository::new(db.pool().clone())),
        Arc::new(PgRefreshTokenRepository::new(db.pool().clone())),
        codec.clone(),
        passwords,
    ));

    let sweeper = spawn_token_cleanup(
        auth.clone(),
        Duration::from_secs(config.auth.cleanup_interval_seconds),
    );

    let health = Arc::new(HealthChecker::new().with_database(db.clone()));
    let state = AppState::new(auth, codec, config.secure_cookies());
    let app = build_router(state, health);

    // Start server
    let addr = config.server_addr();
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    db.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,cm_server=debug,cm_api=debug,cm_auth=debug,tower_http=debug".into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

/// Build the application router
fn build_router(state: AppState, health: Arc<HealthChecker>) -> Router {
    // Health check routes (no auth required)
    let health_routes = Router::new()
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(health);

    Router::new()
        .merge(health_routes)
        .merge(cm_api::router(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new()),
        )
}

/// Periodically delete expired refresh tokens
fn spawn_token_cleanup(auth: Arc<AuthService>, every: Duration) -> JoinHandle<()> {
    let every = every.max(Duration::from_secs(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let deleted = auth.tokens().cleanup_expired().await;
            if deleted > 0 {
                info!(deleted, "Expired refresh tokens removed");
            } else {
                debug!("No expired refresh tokens");
            }
        }
    })
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
