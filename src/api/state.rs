//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use crate::analytics::{FeatureCollection, ScaleKind, DEFAULT_ID_PROPERTY};
use crate::import::{CaseCsvImporter, ImportProgress};
use crate::records::{CacheSnapshot, RecordCache, RecordStore, StoreResult};
use crate::region::RegionCatalog;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Record store gateway
    pub store: Arc<dyn RecordStore>,
    /// Session cache in front of `store.list`
    pub cache: Arc<RecordCache>,
    /// Region catalog used for normalization and map labels
    pub catalog: Arc<RegionCatalog>,
    /// Boundary dataset joined with region totals for the map
    pub boundaries: Arc<FeatureCollection>,
    /// Importer settings for uploaded CSV files
    pub importer: CaseCsvImporter,
    /// Held for the duration of an import; only one runs at a time
    pub import_lock: Arc<Mutex<()>>,
    pub import_progress: Arc<ImportProgress>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Create state with the built-in region catalog, an unbounded cache and
    /// the default importer
    pub fn new(store: Arc<dyn RecordStore>, boundaries: FeatureCollection, config: ApiConfig) -> Self {
        Self {
            store,
            cache: Arc::new(RecordCache::default()),
            catalog: Arc::new(RegionCatalog::philippines().clone()),
            boundaries: Arc::new(boundaries),
            importer: CaseCsvImporter::new(),
            import_lock: Arc::new(Mutex::new(())),
            import_progress: Arc::new(ImportProgress::new()),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    pub fn with_cache(mut self, cache: RecordCache) -> Self {
        self.cache = Arc::new(cache);
        self
    }

    pub fn with_catalog(mut self, catalog: RegionCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn with_importer(mut self, importer: CaseCsvImporter) -> Self {
        self.importer = importer;
        self
    }

    /// Records of the configured collection, through the cache
    pub async fn records(&self, force: bool) -> StoreResult<CacheSnapshot> {
        self.cache
            .get(self.store.as_ref(), &self.config.collection, force)
            .await
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Maximum request body size in bytes (CSV uploads included)
    pub max_body_size: usize,
    /// Collection holding case records
    pub collection: String,
    /// Feature property carrying the region code in the boundary dataset
    pub id_property: String,
    /// Color scale used when a map request names none
    pub default_scale: ScaleKind,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8086,
            max_body_size: 20 * 1024 * 1024, // 20MB
            collection: "dengueData1".to_string(),
            id_property: DEFAULT_ID_PROPERTY.to_string(),
            default_scale: ScaleKind::Relative,
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
