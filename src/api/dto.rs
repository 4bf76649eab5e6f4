//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::{
    AggregateBucket, DashboardView, DateFilter, FeatureCollection, LegendEntry, RegionStats,
    ScaleKind,
};
use crate::import::RowFailure;
use crate::records::{CacheStatus, CaseRecord};
use crate::region::RegionEntry;

// ============================================
// RECORD DTOs
// ============================================

/// Query string for GET /records
///
/// Numeric and date filters arrive as text so malformed values can be
/// reported as validation errors.
#[derive(Debug, Default, Deserialize)]
pub struct RecordsParams {
    /// Bypass the cache
    #[serde(default)]
    pub refresh: bool,
    /// Global search
    pub q: Option<String>,
    pub location: Option<String>,
    pub region: Option<String>,
    pub cases: Option<String>,
    pub deaths: Option<String>,
    /// ISO date, exact match
    pub date: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// One page of the record table
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordsResponse {
    /// Matching records across all pages
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub pages: usize,
    pub records: Vec<CaseRecord>,
    /// When the underlying snapshot was fetched from the store
    pub fetched_at: DateTime<Utc>,
}

/// Response for a created record
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRecordResponse {
    pub id: String,
}

// ============================================
// IMPORT DTOs
// ============================================

#[derive(Debug, Default, Deserialize)]
pub struct ImportParams {
    /// Override the number of leading data rows to drop
    pub skip_rows: Option<usize>,
}

/// Outcome of a CSV upload
#[derive(Debug, Serialize, Deserialize)]
pub struct ImportResponse {
    /// "ok", "partial" or "failed"
    pub status: String,
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub written: usize,
    pub failed: usize,
    /// Rows the store rejected
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<RowFailure>,
}

// ============================================
// DASHBOARD / MAP DTOs
// ============================================

/// Query string for GET /dashboard
#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    pub year: Option<String>,
    pub month: Option<String>,
    pub group_by: Option<String>,
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub view: DashboardView,
    pub fetched_at: DateTime<Utc>,
}

/// Query string for GET /map
#[derive(Debug, Default, Deserialize)]
pub struct MapParams {
    pub year: Option<String>,
    pub month: Option<String>,
    pub scale: Option<String>,
    #[serde(default)]
    pub refresh: bool,
}

/// Enriched choropleth data
#[derive(Debug, Serialize)]
pub struct MapResponse {
    pub filter: DateFilter,
    pub scale: ScaleKind,
    pub stats: RegionStats,
    /// Bands from darkest to lightest
    pub legend: Vec<LegendEntry>,
    /// Color for counts below every band
    pub floor_color: String,
    /// Region names with no catalog match, left off the map
    pub unmatched: Vec<AggregateBucket>,
    pub geojson: FeatureCollection,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct RegionsResponse {
    pub count: usize,
    pub regions: Vec<RegionEntry>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy" or "degraded"
    pub status: String,
    /// Record store status: "ok" or "error"
    pub store: String,
    /// Record store backend name
    pub backend: String,
    pub cache: CacheStatus,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Server version
    pub version: String,
}
