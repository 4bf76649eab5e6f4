//! In-memory record store
//!
//! Keeps raw documents per collection in insertion order. Used by tests, the
//! demo configuration, and anywhere persistence is not wanted.

use super::{CaseRecord, NewCaseRecord, RecordStore, StoreError, StoreResult};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

type Document = (String, Map<String, Value>);

/// Record store held entirely in process memory
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a collection with raw documents, bypassing typed inserts.
    ///
    /// Lets callers load loosely-typed data exactly as an external store
    /// would hold it.
    pub async fn seed_documents(
        &self,
        collection: &str,
        documents: impl IntoIterator<Item = (String, Map<String, Value>)>,
    ) {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .extend(documents);
    }

    /// Number of documents in a collection
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list(&self, collection: &str) -> StoreResult<Vec<CaseRecord>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| CaseRecord::from_document(id.clone(), fields))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, collection: &str, record: &NewCaseRecord) -> StoreResult<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .push((id.clone(), record.to_document()));
        Ok(id)
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        let docs = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let before = docs.len();
        docs.retain(|(doc_id, _)| doc_id != id);
        if docs.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
