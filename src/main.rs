use axum::{routing::get_service, Router};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rollcall::api::{self, AppState};
use rollcall::config::Config;
use rollcall::db;
use rollcall::services::clock::SystemClock;
use rollcall::store::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rollcall=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting rollcall server...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        late_threshold = %config.policy.late_threshold,
        late_at_threshold = config.policy.late_at_threshold,
        utc_offset = %config.policy.utc_offset,
        "Configuration loaded successfully"
    );

    // Create database pool
    let pool = db::create_pool(
        &config.database_url,
        config.database_max_connections,
        config.policy.storage_timeout,
    )
    .await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Build application state
    let store = Arc::new(PgStore::new(pool));
    let clock = Arc::new(SystemClock::new(config.policy.utc_offset));
    let state = AppState::new(store, clock, config.policy);

    // Member photos
    let upload_routes =
        Router::new().nest_service("/uploads", get_service(ServeDir::new(&config.uploads_dir)));

    // Build router
    let app = api::router(state)
        .merge(upload_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let host: std::net::IpAddr = config.host.parse()?;
    let addr = SocketAddr::from((host, config.port));
    tracing::info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C signal handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, cleaning up...");
}
