//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::analytics::{ScaleKind, DEFAULT_ID_PROPERTY};
use crate::import::{CaseCsvImporter, DEFAULT_DATE_FORMAT, DEFAULT_SKIP_ROWS};
use crate::records::FirestoreConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub import: ImportConfig,

    #[serde(default)]
    pub map: MapConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which record store backend to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process, lost on restart
    Memory,
    /// JSON files under `data_dir`
    #[default]
    File,
    /// Firestore REST API
    Firestore,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "file" => Ok(StoreBackend::File),
            "firestore" => Ok(StoreBackend::Firestore),
            other => Err(format!(
                "unknown store backend {:?}: expected memory, file or firestore",
                other
            )),
        }
    }
}

/// Record store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Collection holding case records
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Directory for the file backend
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default)]
    pub firestore: FirestoreSettings,
}

fn default_collection() -> String {
    "dengueData1".to_string()
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("dengue-dash").to_string_lossy().to_string())
        .unwrap_or_else(|| "./dengue_data".to_string())
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            collection: default_collection(),
            data_dir: default_data_dir(),
            firestore: FirestoreSettings::default(),
        }
    }
}

/// Firestore backend settings
#[derive(Debug, Clone, Deserialize)]
pub struct FirestoreSettings {
    #[serde(default)]
    pub project_id: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_firestore_url")]
    pub base_url: String,

    #[serde(default = "default_firestore_database")]
    pub database: String,

    #[serde(default = "default_firestore_timeout")]
    pub request_timeout_ms: u64,
}

fn default_firestore_url() -> String {
    "https://firestore.googleapis.com/v1".to_string()
}

fn default_firestore_database() -> String {
    "(default)".to_string()
}

fn default_firestore_timeout() -> u64 {
    10_000
}

impl Default for FirestoreSettings {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            api_key: None,
            base_url: default_firestore_url(),
            database: default_firestore_database(),
            request_timeout_ms: default_firestore_timeout(),
        }
    }
}

impl FirestoreSettings {
    pub fn to_gateway_config(&self) -> FirestoreConfig {
        FirestoreConfig {
            base_url: self.base_url.clone(),
            project_id: self.project_id.clone(),
            database: self.database.clone(),
            api_key: self.api_key.clone().filter(|k| !k.is_empty()),
            request_timeout_ms: self.request_timeout_ms,
            ..Default::default()
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound on request bodies, CSV uploads included
    #[serde(default = "default_max_body_mb")]
    pub max_body_mb: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8086
}

fn default_max_body_mb() -> usize {
    20
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_mb: default_max_body_mb(),
        }
    }
}

/// Record cache configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
    /// Refetch snapshots older than this; unset keeps them until a write
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

impl CacheConfig {
    pub fn max_age(&self) -> Option<chrono::Duration> {
        self.max_age_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .map(chrono::Duration::seconds)
    }
}

/// CSV import configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// Leading data rows dropped from every upload
    #[serde(default = "default_skip_rows")]
    pub skip_rows: usize,

    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_skip_rows() -> usize {
    DEFAULT_SKIP_ROWS
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            skip_rows: default_skip_rows(),
            date_format: default_date_format(),
        }
    }
}

impl ImportConfig {
    pub fn importer(&self) -> CaseCsvImporter {
        CaseCsvImporter::new()
            .with_skip_rows(self.skip_rows)
            .with_date_format(&self.date_format)
    }
}

/// Choropleth configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    /// GeoJSON boundary file; the bundled dataset is used when unset
    #[serde(default)]
    pub boundaries_path: Option<String>,

    #[serde(default = "default_id_property")]
    pub id_property: String,

    #[serde(default)]
    pub scale: ScaleKind,
}

fn default_id_property() -> String {
    DEFAULT_ID_PROPERTY.to_string()
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            boundaries_path: None,
            id_property: default_id_property(),
            scale: ScaleKind::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        // Try default config locations
        let config_paths = [
            dirs::config_dir().map(|p| p.join("dengue-dash").join("config.toml")),
            Some(PathBuf::from("/etc/dengue-dash/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        // Fall back to environment-only config
        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Store overrides
        if let Some(backend) = lookup("DENGUE_STORE_BACKEND") {
            match backend.parse() {
                Ok(b) => self.store.backend = b,
                Err(e) => tracing::warn!("Ignoring DENGUE_STORE_BACKEND: {}", e),
            }
        }
        if let Some(collection) = lookup("DENGUE_COLLECTION") {
            self.store.collection = collection;
        }
        if let Some(data_dir) = lookup("DENGUE_DATA_DIR") {
            self.store.data_dir = data_dir;
        }
        if let Some(project_id) = lookup("DENGUE_FIRESTORE_PROJECT") {
            self.store.firestore.project_id = project_id;
        }
        if let Some(api_key) = lookup("DENGUE_FIRESTORE_API_KEY") {
            self.store.firestore.api_key = Some(api_key);
        }

        // API overrides
        if let Some(host) = lookup("DENGUE_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = lookup("DENGUE_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        // Map overrides
        if let Some(path) = lookup("DENGUE_BOUNDARIES_PATH") {
            self.map.boundaries_path = Some(path);
        }

        // Logging overrides
        if let Some(level) = lookup("DENGUE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("DENGUE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Server settings for the API layer
    pub fn api_config(&self) -> crate::api::ApiConfig {
        crate::api::ApiConfig {
            host: self.api.host.clone(),
            port: self.api.port,
            max_body_size: self.api.max_body_mb.saturating_mul(1024 * 1024),
            collection: self.store.collection.clone(),
            id_property: self.map.id_property.clone(),
            default_scale: self.map.scale,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Dengue Dashboard Configuration
#
# Environment variables override these settings:
# - DENGUE_STORE_BACKEND
# - DENGUE_COLLECTION
# - DENGUE_DATA_DIR
# - DENGUE_FIRESTORE_PROJECT
# - DENGUE_FIRESTORE_API_KEY
# - DENGUE_API_HOST
# - DENGUE_API_PORT
# - DENGUE_BOUNDARIES_PATH
# - DENGUE_LOG_LEVEL
# - DENGUE_LOG_FORMAT

[store]
# Record store backend: memory, file or firestore
backend = "file"

# Collection holding case records
collection = "dengueData1"

# Directory for the file backend
data_dir = "~/.local/share/dengue-dash"

[store.firestore]
# Google Cloud project id
project_id = ""

# Web API key (optional)
# api_key = ""

base_url = "https://firestore.googleapis.com/v1"
database = "(default)"

# Request timeout (ms)
request_timeout_ms = 10000

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8086

# Maximum request body size, CSV uploads included (MB)
max_body_mb = 20

[cache]
# Refetch records older than this many seconds.
# Leave unset to keep records until the next add, delete or import.
# max_age_secs = 300

[import]
# Leading data rows dropped from every upload (sheet metadata)
skip_rows = 2

# Format of the date column
date_format = "%d/%m/%Y"

[map]
# GeoJSON region boundaries; the bundled dataset is used when unset
# boundaries_path = "/usr/share/dengue-dash/regions.geojson"

# Feature property holding the region code
id_property = "id"

# Color scale: relative (bands around the mean) or absolute (fixed thresholds)
scale = "relative"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store.backend, StoreBackend::File);
        assert_eq!(config.store.collection, "dengueData1");
        assert_eq!(config.import.skip_rows, 2);
        assert_eq!(config.map.scale, ScaleKind::Relative);
        assert!(config.cache.max_age().is_none());
    }

    #[test]
    fn test_generated_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.api.port, 8086);
        assert_eq!(config.import.date_format, "%d/%m/%Y");
        assert_eq!(config.map.id_property, "id");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_partial_file() {
        let config: Config = toml::from_str(
            r#"
            [store]
            backend = "firestore"
            collection = "dengue_cases_lab3"

            [store.firestore]
            project_id = "dengue-ph"

            [cache]
            max_age_secs = 60

            [map]
            scale = "absolute"
            "#,
        )
        .unwrap();

        assert_eq!(config.store.backend, StoreBackend::Firestore);
        assert_eq!(config.store.firestore.project_id, "dengue-ph");
        assert_eq!(config.store.firestore.database, "(default)");
        assert_eq!(config.cache.max_age(), Some(chrono::Duration::seconds(60)));
        assert_eq!(config.map.scale, ScaleKind::Absolute);
        assert_eq!(config.api.port, 8086);

        let api = config.api_config();
        assert_eq!(api.collection, "dengue_cases_lab3");
        assert_eq!(api.default_scale, ScaleKind::Absolute);
        assert_eq!(api.max_body_size, 20 * 1024 * 1024);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("DENGUE_STORE_BACKEND", "memory"),
            ("DENGUE_API_PORT", "9000"),
            ("DENGUE_FIRESTORE_API_KEY", "k"),
            ("DENGUE_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.store.firestore.api_key.as_deref(), Some("k"));
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "DENGUE_STORE_BACKEND" => Some("postgres".to_string()),
            "DENGUE_API_PORT" => Some("not-a-port".to_string()),
            _ => None,
        });

        assert_eq!(config.store.backend, StoreBackend::File);
        assert_eq!(config.api.port, 8086);
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api\nport = 1").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let err = Config::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_importer_from_config() {
        let import = ImportConfig {
            skip_rows: 0,
            date_format: "%Y-%m-%d".to_string(),
        };
        let parsed = import
            .importer()
            .parse_str("loc,date\nPasig,2021-06-05\n")
            .unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert!(parsed.rows[0].record.date.is_some());
    }
}
