//! Dashboard Routes
//!
//! - GET /api/v1/dashboard - Aggregated chart series

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::analytics::{DashboardView, DateFilter, GroupBy};
use crate::api::dto::{DashboardParams, DashboardResponse};
use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// GET /api/v1/dashboard
///
/// Query: `year` (YYYY), `month` (MM), `group_by` (location, region or
/// region_name; defaults to location).
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DashboardParams>,
) -> ApiResult<Json<DashboardResponse>> {
    let filter = DateFilter::new(params.year.as_deref(), params.month.as_deref())?;
    let group_by = match params.group_by.as_deref().filter(|g| !g.is_empty()) {
        Some(raw) => raw.parse::<GroupBy>()?,
        None => GroupBy::default(),
    };

    let snapshot = state.records(params.refresh).await?;
    let view = DashboardView::build(&snapshot.records, &state.catalog, group_by, filter);

    tracing::debug!(
        group_by = %group_by,
        records = snapshot.records.len(),
        buckets = view.buckets.len(),
        from_cache = snapshot.from_cache,
        "Dashboard aggregated"
    );

    Ok(Json(DashboardResponse {
        view,
        fetched_at: snapshot.fetched_at,
    }))
}
