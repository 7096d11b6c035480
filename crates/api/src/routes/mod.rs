//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod finance;
pub mod health;
pub mod snapshots;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(snapshots::routes())
        .merge(finance::routes())
}
