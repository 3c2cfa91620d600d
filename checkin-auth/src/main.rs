use checkin_auth::{
    build_router,
    config::AuthConfig,
    db,
    services::{GoogleProvider, PgDirectory, PgRefreshTokenStore, RedisStateStore},
    AppState,
};
use service_core::axum::Router;
use service_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = AuthConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    )?;

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting check-in auth service"
    );

    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool).await?;

    let directory = Arc::new(PgDirectory::new(pool.clone()));
    let refresh_tokens = Arc::new(PgRefreshTokenStore::new(pool));
    let states = Arc::new(RedisStateStore::new(&config.redis).await?);
    let provider = Arc::new(GoogleProvider::new(config.google.clone()));

    let state = AppState::new(
        config.clone(),
        directory,
        refresh_tokens,
        states,
        provider,
    )?;

    // Business routes are mounted by the hosting application through
    // `admin_routes` / `event_routes`; standalone the service serves auth only.
    let app = build_router(state, Router::new());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    service_core::axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
