//! Monthly stock snapshot routes.
//!
//! Completed months are served from frozen snapshot rows; the current month
//! (on the business calendar) is computed live from the inventory ledger.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::info;

use warpline_core::Clock;
use warpline_core::stock::{
    Rollup, SnapshotEngine, SnapshotError, SnapshotFilter, SnapshotPeriod, SnapshotQuery,
};
use warpline_db::StockRepository;
use warpline_shared::types::PageRequest;
use warpline_shared::{AppError, ReportingConfig};

use crate::AppState;
use crate::error::{error_response, validation_error};

/// Query parameters for the snapshot listing.
#[derive(Debug, Default, Deserialize)]
pub struct SnapshotParams {
    /// Case-insensitive search over SKU code, product name and colour.
    pub search: Option<String>,
    /// Exact category.
    pub category: Option<String>,
    /// `sku` (default) or `product`.
    pub rollup: Option<String>,
    /// Page number, starting at 1.
    pub page: Option<u32>,
    /// Page size.
    pub limit: Option<u32>,
}

/// Creates snapshot routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/inventory/snapshots/{year}/{month}", get(get_monthly_snapshot))
        .route(
            "/inventory/snapshots/{year}/{month}/summary",
            get(get_snapshot_summary),
        )
}

fn engine(state: &AppState) -> Result<SnapshotEngine<StockRepository, Arc<dyn Clock>>, Response> {
    let offset = state
        .reporting
        .utc_offset()
        .map_err(|e| error_response(AppError::Internal(e.to_string())))?;
    Ok(SnapshotEngine::new(
        StockRepository::new((*state.db).clone()),
        Arc::clone(&state.clock),
        offset,
    ))
}

/// Parses the `{year}/{month}` path segments into a period.
fn parse_period(year: &str, month: &str) -> Result<SnapshotPeriod, Response> {
    let Ok(year) = year.parse::<i32>() else {
        return Err(validation_error(format!("Year must be an integer, got '{year}'")));
    };
    let Ok(month) = month.parse::<u32>() else {
        return Err(validation_error(format!("Month must be an integer, got '{month}'")));
    };
    SnapshotPeriod::new(year, month).map_err(error_response)
}

/// Validates listing parameters against the reporting settings.
///
/// A blank category is treated as absent.
pub fn build_query(
    period: SnapshotPeriod,
    params: SnapshotParams,
    reporting: &ReportingConfig,
) -> Result<SnapshotQuery, SnapshotError> {
    let rollup = match params.rollup.as_deref() {
        None => Rollup::default(),
        Some(raw) => raw.parse::<Rollup>().map_err(SnapshotError::InvalidRollup)?,
    };

    let page = PageRequest::new(
        params.page.unwrap_or(1),
        params.limit.unwrap_or(reporting.default_page_size),
    );
    page.validate(reporting.max_page_size)?;

    Ok(SnapshotQuery {
        period,
        filter: SnapshotFilter {
            search: params.search,
            category: params.category.filter(|c| !c.trim().is_empty()),
        },
        rollup,
        page,
    })
}

/// GET `/inventory/snapshots/{year}/{month}` - Enriched, paginated snapshot rows.
async fn get_monthly_snapshot(
    State(state): State<AppState>,
    Path((year, month)): Path<(String, String)>,
    params: Result<Query<SnapshotParams>, QueryRejection>,
) -> Response {
    let period = match parse_period(&year, &month) {
        Ok(period) => period,
        Err(response) => return response,
    };
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => return validation_error(rejection.body_text()),
    };
    let query = match build_query(period, params, &state.reporting) {
        Ok(query) => query,
        Err(e) => return error_response(e),
    };
    let engine = match engine(&state) {
        Ok(engine) => engine,
        Err(response) => return response,
    };

    match engine.enriched_snapshot(&query).await {
        Ok(page) => {
            info!(
                year = period.year(),
                month = period.month(),
                is_live = page.is_live,
                rows = page.page.total,
                "Served stock snapshot"
            );
            (StatusCode::OK, Json(page)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// GET `/inventory/snapshots/{year}/{month}/summary` - Month-level totals.
async fn get_snapshot_summary(
    State(state): State<AppState>,
    Path((year, month)): Path<(String, String)>,
) -> Response {
    let period = match parse_period(&year, &month) {
        Ok(period) => period,
        Err(response) => return response,
    };
    let engine = match engine(&state) {
        Ok(engine) => engine,
        Err(response) => return response,
    };

    match engine.summary(period).await {
        Ok(summary) => {
            info!(
                year = period.year(),
                month = period.month(),
                is_live = summary.is_live,
                skus = summary.sku_count,
                "Served stock summary"
            );
            (StatusCode::OK, Json(summary)).into_response()
        }
        Err(e) => error_response(e),
    }
}
