//! Import Routes
//!
//! - POST /api/v1/import - Upload a CSV export
//! - GET /api/v1/import/status - Progress of the current or last import
//!
//! The upload is parsed in full before any record is written. A parse failure
//! returns 400 and leaves the store untouched; rows the store rejects during
//! writing are reported per row with 207.
//!
//! The write phase runs on its own task. A client that disconnects mid-upload
//! does not stop it: every row is attempted, the cache is invalidated and the
//! progress reaches a final state either way.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::dto::{ImportParams, ImportResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::import::ImportStatus;

/// POST /api/v1/import
///
/// Body is the CSV text. Only one import runs at a time; a second upload
/// while one is in flight gets 409.
pub async fn import_csv(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ImportParams>,
    body: String,
) -> ApiResult<(StatusCode, Json<ImportResponse>)> {
    let guard = Arc::clone(&state.import_lock)
        .try_lock_owned()
        .map_err(|_| ApiError::Conflict("An import is already running".to_string()))?;

    if body.trim().is_empty() {
        return Err(ApiError::Validation("Empty upload".to_string()));
    }

    let importer = match params.skip_rows {
        Some(skip_rows) => state.importer.clone().with_skip_rows(skip_rows),
        None => state.importer.clone(),
    };

    let parsed = match importer.parse_str(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            state.import_progress.fail(e.to_string()).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        collection = %state.config.collection,
        rows = parsed.rows.len(),
        skipped = parsed.rows_skipped,
        "CSV parsed, writing records"
    );

    let store = Arc::clone(&state.store);
    let cache = Arc::clone(&state.cache);
    let progress = Arc::clone(&state.import_progress);
    let collection = state.config.collection.clone();

    let writer = tokio::spawn(async move {
        let report = importer
            .import_into(store.as_ref(), &collection, parsed, Some(progress.as_ref()))
            .await;

        if report.written > 0 {
            cache.invalidate().await;
        }

        // Released only once the cache reflects the import
        drop(guard);
        report
    });

    let report = writer
        .await
        .map_err(|e| ApiError::Internal(format!("Import task failed: {}", e)))?;

    let (status, status_str) = if report.is_complete() {
        (StatusCode::CREATED, "ok")
    } else if report.written > 0 {
        (StatusCode::MULTI_STATUS, "partial")
    } else {
        (StatusCode::MULTI_STATUS, "failed")
    };

    Ok((
        status,
        Json(ImportResponse {
            status: status_str.to_string(),
            rows_read: report.rows_read,
            rows_skipped: report.rows_skipped,
            written: report.written,
            failed: report.failures.len(),
            failures: report.failures,
        }),
    ))
}

/// GET /api/v1/import/status
pub async fn import_status(State(state): State<Arc<AppState>>) -> Json<ImportStatus> {
    Json(state.import_progress.status().await)
}
