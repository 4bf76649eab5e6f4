//! # Dengue Dashboard
//!
//! Backend for a dengue case dashboard: case reports are entered one at a time
//! or bulk-imported from CSV into a remote document store, then listed in a
//! filterable table, aggregated into chart series, and joined onto regional
//! boundaries for a choropleth map.
//!
//! ## Modules
//!
//! - [`records`]: Record store gateway, typed case records, session cache
//! - [`region`]: Region catalog and free-text region name normalization
//! - [`analytics`]: Aggregation, region statistics, map enrichment, table queries
//! - [`import`]: Two-phase CSV importer
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML and environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dengue_dash::analytics::{aggregate, DateFilter, GroupBy};
//! use dengue_dash::records::{MemoryStore, NewCaseRecord, RecordCache, RecordStore};
//! use dengue_dash::region::RegionCatalog;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryStore::new();
//!     store
//!         .insert("dengueData1", &NewCaseRecord::new("Butuan", "CARAGA").cases(10).deaths(1))
//!         .await?;
//!     store
//!         .insert("dengueData1", &NewCaseRecord::new("Surigao", "caraga").cases(5))
//!         .await?;
//!
//!     let cache = RecordCache::default();
//!     let snapshot = cache.get(&store, "dengueData1", false).await?;
//!
//!     let buckets = aggregate(
//!         &snapshot.records,
//!         RegionCatalog::philippines(),
//!         GroupBy::Region,
//!         &DateFilter::default(),
//!     );
//!
//!     // One bucket: PH13 with 15 cases and 1 death
//!     println!("{:?}", buckets);
//!
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod api;
pub mod config;
pub mod import;
pub mod records;
pub mod region;

// Re-export top-level types for convenience
pub use records::{
    CacheSnapshot, CaseRecord, FirestoreConfig, FirestoreStore, JsonFileStore, MemoryStore,
    NewCaseRecord, RecordCache, RecordStore, StoreError, StoreResult,
};

pub use region::{CatalogError, RegionCatalog, RegionCode, RegionEntry};

pub use analytics::{
    aggregate, decorate, enrich, region_totals, AggregateBucket, ColorScale, DashboardView,
    DateFilter, FeatureCollection, FilterError, GroupBy, RecordPage, RecordQuery, RegionStats,
    RegionTotals, ScaleKind,
};

pub use import::{CaseCsvImporter, ImportError, ImportProgress, ImportReport};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use config::{
    ApiConfig as ConfigApiConfig, Config, ConfigError, LoggingConfig, StoreBackend, StoreConfig,
};
