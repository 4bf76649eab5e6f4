//! Map Routes
//!
//! - GET /api/v1/map - Boundary GeoJSON enriched with per-region totals

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::analytics::{
    decorate, enrich, region_totals, unmatched_regions, ColorScale, DateFilter, RegionStats,
    ScaleKind,
};
use crate::api::dto::{MapParams, MapResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

/// GET /api/v1/map
///
/// Query: `year`, `month`, `scale` (relative or absolute). Every boundary
/// feature gains `cases`, `deaths`, `fill` and, when the code is known,
/// `region_name`.
pub async fn get_map(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MapParams>,
) -> ApiResult<Json<MapResponse>> {
    let filter = DateFilter::new(params.year.as_deref(), params.month.as_deref())?;
    let scale_kind = match params.scale.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => raw.parse::<ScaleKind>().map_err(ApiError::Validation)?,
        None => state.config.default_scale,
    };

    let snapshot = state.records(params.refresh).await?;

    let totals = region_totals(&snapshot.records, &state.catalog, &filter);
    let stats = RegionStats::from_totals(&totals);
    let scale = ColorScale::for_kind(scale_kind, &stats);

    let mut geojson = enrich(&state.boundaries, &totals, &state.config.id_property);
    decorate(&mut geojson, &state.catalog, &scale, &state.config.id_property);

    let unmatched = unmatched_regions(&snapshot.records, &state.catalog, &filter);
    if !unmatched.is_empty() {
        tracing::debug!(
            names = unmatched.len(),
            "Region names without a catalog match left off the map"
        );
    }

    Ok(Json(MapResponse {
        filter,
        scale: scale_kind,
        stats,
        legend: scale.legend().to_vec(),
        floor_color: scale.floor_color().to_string(),
        unmatched,
        geojson,
        fetched_at: snapshot.fetched_at,
    }))
}
