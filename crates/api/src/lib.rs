//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST API routes for stock snapshots and payment matching
//! - Application state shared by handlers
//! - JSON error responses

pub mod error;
pub mod routes;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use warpline_core::Clock;
use warpline_shared::ReportingConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Source of "now" for deciding which month is live.
    pub clock: Arc<dyn Clock>,
    /// Business calendar and page size settings.
    pub reporting: ReportingConfig,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
