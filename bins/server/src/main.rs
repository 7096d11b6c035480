//! Warpline API Server
//!
//! Main entry point for the Warpline inventory and finance service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use warpline_api::{AppState, create_router};
use warpline_core::SystemClock;
use warpline_db::connect_with;
use warpline_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warpline=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect_with(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    info!(
        utc_offset_minutes = config.reporting.utc_offset_minutes,
        default_page_size = config.reporting.default_page_size,
        max_page_size = config.reporting.max_page_size,
        "Reporting calendar configured"
    );

    let state = AppState {
        db: Arc::new(db),
        clock: Arc::new(SystemClock),
        reporting: config.reporting.clone(),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
