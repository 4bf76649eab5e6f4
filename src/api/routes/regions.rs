//! Region Routes
//!
//! - GET /api/v1/regions - The region catalog

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::RegionsResponse;
use crate::api::state::AppState;

/// GET /api/v1/regions
pub async fn list_regions(State(state): State<Arc<AppState>>) -> Json<RegionsResponse> {
    Json(RegionsResponse {
        count: state.catalog.len(),
        regions: state.catalog.entries().to_vec(),
    })
}
