//! Record Store Gateway
//!
//! Case records live in an external document store. This module provides:
//! - [`RecordStore`]: the gateway trait (`list`, `insert`, `delete`)
//! - Backends: [`MemoryStore`], [`JsonFileStore`], [`FirestoreStore`]
//! - [`RecordCache`]: the session cache sitting in front of `list`
//!
//! All backends decode documents through [`CaseRecord::from_document`], so the
//! rest of the crate only ever sees well-formed records.

mod cache;
mod error;
mod file;
mod firestore;
mod memory;
mod types;

pub use cache::{CacheSnapshot, CacheStatus, RecordCache};
pub use error::{StoreError, StoreResult};
pub use file::JsonFileStore;
pub use firestore::{FirestoreConfig, FirestoreStore};
pub use memory::MemoryStore;
pub use types::{parse_count, parse_iso_date, CaseRecord, NewCaseRecord, ISO_DATE_FORMAT};

use async_trait::async_trait;

/// Gateway to a document store holding case records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short backend name for logs and health output
    fn name(&self) -> &str;

    /// Fetch every record in a collection, in store order
    async fn list(&self, collection: &str) -> StoreResult<Vec<CaseRecord>>;

    /// Persist a record and return its new id
    async fn insert(&self, collection: &str, record: &NewCaseRecord) -> StoreResult<String>;

    /// Remove a record by id
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;

    /// Check that the backend is reachable
    async fn health_check(&self, _collection: &str) -> StoreResult<()> {
        Ok(())
    }
}
