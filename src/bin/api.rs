//! Dengue Dashboard API Server
//!
//! Run with: cargo run --bin dengue-api
//!
//! # Configuration
//!
//! Settings come from the first config file found in
//! `~/.config/dengue-dash/config.toml`, `/etc/dengue-dash/config.toml` or
//! `./config.toml`, then from `DENGUE_*` environment variables (see
//! `dengue-cli config`). `RUST_LOG` overrides the configured log level.

use anyhow::Context;
use dengue_dash::analytics::FeatureCollection;
use dengue_dash::api::{serve, AppState};
use dengue_dash::config::{Config, LoggingConfig, StoreBackend};
use dengue_dash::records::{FirestoreStore, JsonFileStore, MemoryStore, RecordCache, RecordStore};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load_default();

    init_tracing(&config.logging);

    tracing::info!("Starting dengue dashboard API v{}", env!("CARGO_PKG_VERSION"));

    let store = build_store(&config)?;
    tracing::info!(
        backend = store.name(),
        collection = %config.store.collection,
        "Record store configured"
    );

    match store.health_check(&config.store.collection).await {
        Ok(()) => tracing::info!("Record store reachable"),
        Err(e) => tracing::warn!("Record store not reachable yet: {}", e),
    }

    let boundaries = load_boundaries(config.map.boundaries_path.as_deref())?;
    tracing::info!(features = boundaries.len(), "Boundary dataset loaded");

    let api_config = config.api_config();
    let state = AppState::new(store, boundaries, api_config.clone())
        .with_cache(RecordCache::new(config.cache.max_age()))
        .with_importer(config.import.importer());

    tracing::info!("Starting server on {}", api_config.addr());
    serve(state, &api_config).await?;

    tracing::info!("Dengue dashboard API stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("dengue_dash={},tower_http=debug", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn build_store(config: &Config) -> anyhow::Result<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory record store; records are lost on restart");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::File => {
            tracing::info!("Data directory: {:?}", config.store.data_dir);
            Arc::new(
                JsonFileStore::open(&config.store.data_dir)
                    .with_context(|| format!("opening data dir {}", config.store.data_dir))?,
            )
        }
        StoreBackend::Firestore => {
            let firestore = &config.store.firestore;
            if firestore.project_id.is_empty() {
                anyhow::bail!(
                    "Firestore backend requires store.firestore.project_id (or DENGUE_FIRESTORE_PROJECT)"
                );
            }
            Arc::new(
                FirestoreStore::new(firestore.to_gateway_config())
                    .context("creating Firestore client")?,
            )
        }
    };

    Ok(store)
}

fn load_boundaries(path: Option<&str>) -> anyhow::Result<FeatureCollection> {
    match path {
        Some(path) => FeatureCollection::load(Path::new(path))
            .with_context(|| format!("loading boundaries from {}", path)),
        None => FeatureCollection::bundled().context("parsing bundled boundaries"),
    }
}
