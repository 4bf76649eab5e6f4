//! Analytics over case records
//!
//! Pure functions from records to views: aggregation buckets, per-region totals
//! and their statistics, choropleth enrichment, dashboard series, and the
//! filtered record table.

pub mod aggregate;
pub mod dashboard;
pub mod geo;
pub mod stats;
pub mod table;

pub use aggregate::{
    aggregate, available_years, region_totals, unmatched_regions, AggregateBucket, DateFilter,
    FilterError, GroupBy, RegionTotals, Totals,
};
pub use dashboard::{DashboardView, ScatterPoint};
pub use geo::{decorate, enrich, Feature, FeatureCollection, GeoError, DEFAULT_ID_PROPERTY};
pub use stats::{ColorScale, LegendEntry, RegionStats, ScaleKind};
pub use table::{RecordPage, RecordQuery, SortField, SortOrder};
