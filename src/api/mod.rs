//! Dengue Dashboard REST API
//!
//! HTTP API layer, built with Axum. Serves JSON and GeoJSON for the
//! presentation layer; rendering happens client-side.
//!
//! # Endpoints
//!
//! ## Records
//! - `GET /api/v1/records` - Filtered, sorted, paged record table
//! - `POST /api/v1/records` - Add a record
//! - `DELETE /api/v1/records/:id` - Delete a record
//!
//! ## Import
//! - `POST /api/v1/import` - Upload a CSV export
//! - `GET /api/v1/import/status` - Import progress
//!
//! ## Views
//! - `GET /api/v1/dashboard` - Aggregated chart series
//! - `GET /api/v1/map` - Choropleth GeoJSON with legend
//! - `GET /api/v1/regions` - Region catalog
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use dengue_dash::analytics::FeatureCollection;
//! use dengue_dash::api::{serve, ApiConfig, AppState};
//! use dengue_dash::records::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApiConfig::default();
//!     let state = AppState::new(
//!         Arc::new(MemoryStore::new()),
//!         FeatureCollection::bundled()?,
//!         config.clone(),
//!     );
//!     serve(state, &config).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let max_body_size = state.config.max_body_size;

    let api_routes = Router::new()
        // Record routes
        .route("/records", get(routes::records::list_records))
        .route("/records", post(routes::records::create_record))
        .route("/records/:id", delete(routes::records::delete_record))
        // View routes
        .route("/dashboard", get(routes::dashboard::get_dashboard))
        .route("/map", get(routes::map::get_map))
        .route("/regions", get(routes::regions::list_regions))
        // Import routes
        .route("/import/status", get(routes::import::import_status))
        .route("/import", post(routes::import::import_csv))
        .layer(DefaultBodyLimit::max(max_body_size));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Dengue dashboard API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Dengue dashboard API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
