//! Record Routes
//!
//! Endpoints for the case record table and manual entry.
//!
//! - GET /api/v1/records - Filtered, sorted, paged records
//! - POST /api/v1/records - Add a record
//! - DELETE /api/v1/records/:id - Delete a record

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::analytics::table::DEFAULT_PER_PAGE;
use crate::analytics::{RecordQuery, SortField, SortOrder};
use crate::api::dto::{CreateRecordResponse, RecordsParams, RecordsResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::records::{parse_iso_date, NewCaseRecord};

const MAX_TEXT_LEN: usize = 200;

/// GET /api/v1/records
///
/// List records from the cached snapshot. `refresh=true` refetches first.
pub async fn list_records(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecordsParams>,
) -> ApiResult<Json<RecordsResponse>> {
    let query = build_query(&params)?;
    let snapshot = state.records(params.refresh).await?;
    let page = query.apply(&snapshot.records);

    Ok(Json(RecordsResponse {
        total: page.total,
        page: page.page,
        per_page: page.per_page,
        pages: page.pages,
        records: page.records,
        fetched_at: snapshot.fetched_at,
    }))
}

/// POST /api/v1/records
///
/// Add a single record. The cache is invalidated on success.
pub async fn create_record(
    State(state): State<Arc<AppState>>,
    Json(record): Json<NewCaseRecord>,
) -> ApiResult<(StatusCode, Json<CreateRecordResponse>)> {
    validate_record(&record)?;

    let id = state.store.insert(&state.config.collection, &record).await?;
    state.cache.invalidate().await;

    tracing::info!(
        collection = %state.config.collection,
        record_id = %id,
        location = %record.location,
        "Record added"
    );

    Ok((StatusCode::CREATED, Json(CreateRecordResponse { id })))
}

/// DELETE /api/v1/records/:id
pub async fn delete_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if id.trim().is_empty() {
        return Err(ApiError::Validation("Record id cannot be empty".to_string()));
    }

    state.store.delete(&state.config.collection, &id).await?;
    state.cache.invalidate().await;

    tracing::info!(collection = %state.config.collection, record_id = %id, "Record deleted");

    Ok(StatusCode::NO_CONTENT)
}

fn build_query(params: &RecordsParams) -> ApiResult<RecordQuery> {
    let cases = parse_exact_count("cases", params.cases.as_deref())?;
    let deaths = parse_exact_count("deaths", params.deaths.as_deref())?;

    let date = match non_empty(params.date.as_deref()) {
        Some(raw) => Some(parse_iso_date(raw).ok_or_else(|| {
            ApiError::Validation(format!("Invalid date {:?}: expected YYYY-MM-DD", raw))
        })?),
        None => None,
    };

    let sort = non_empty(params.sort.as_deref())
        .map(str::parse::<SortField>)
        .transpose()
        .map_err(ApiError::Validation)?;
    let order = non_empty(params.order.as_deref())
        .map(str::parse::<SortOrder>)
        .transpose()
        .map_err(ApiError::Validation)?
        .unwrap_or_default();

    Ok(RecordQuery {
        search: non_empty(params.q.as_deref()).map(str::to_string),
        location: non_empty(params.location.as_deref()).map(str::to_string),
        region: non_empty(params.region.as_deref()).map(str::to_string),
        cases,
        deaths,
        date,
        sort,
        order,
        page: params.page.unwrap_or(1),
        per_page: params.per_page.unwrap_or(DEFAULT_PER_PAGE),
    })
}

fn parse_exact_count(field: &str, raw: Option<&str>) -> ApiResult<Option<u64>> {
    match non_empty(raw) {
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            ApiError::Validation(format!("Invalid {} filter {:?}: expected a count", field, raw))
        }),
        None => Ok(None),
    }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.filter(|s| !s.is_empty())
}

fn validate_record(record: &NewCaseRecord) -> ApiResult<()> {
    if record.location.trim().is_empty() {
        return Err(ApiError::Validation("Location cannot be empty".to_string()));
    }

    if record.location.len() > MAX_TEXT_LEN {
        return Err(ApiError::Validation(format!(
            "Location exceeds maximum length of {} characters",
            MAX_TEXT_LEN
        )));
    }

    if record.region.len() > MAX_TEXT_LEN {
        return Err(ApiError::Validation(format!(
            "Region exceeds maximum length of {} characters",
            MAX_TEXT_LEN
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query_defaults() {
        let query = build_query(&RecordsParams::default()).unwrap();
        assert_eq!(query, RecordQuery::default());
    }

    #[test]
    fn test_build_query_rejects_bad_filters() {
        let params = RecordsParams {
            cases: Some("many".to_string()),
            ..Default::default()
        };
        assert!(matches!(build_query(&params), Err(ApiError::Validation(_))));

        let params = RecordsParams {
            date: Some("05/06/2021".to_string()),
            ..Default::default()
        };
        assert!(matches!(build_query(&params), Err(ApiError::Validation(_))));

        let params = RecordsParams {
            sort: Some("population".to_string()),
            ..Default::default()
        };
        assert!(matches!(build_query(&params), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_validate_record() {
        assert!(validate_record(&NewCaseRecord::new("Manila", "NCR").cases(3).deaths(1)).is_ok());
        assert!(validate_record(&NewCaseRecord::new("  ", "NCR")).is_err());
        assert!(validate_record(&NewCaseRecord::new("Manila", "x".repeat(201))).is_err());
    }
}
