//! JSON file record store
//!
//! One pretty-printed JSON array per collection under `data_dir`. The whole
//! file is rewritten on each mutation (write to a temp file, then rename), so
//! inserting N rows one at a time costs O(N^2) bytes of disk I/O. Fine for the
//! few thousand rows of a regional export; use Firestore for anything larger.
//!
//! File access runs on the blocking thread pool.

use super::{CaseRecord, NewCaseRecord, RecordStore, StoreError, StoreResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[derive(Debug, Serialize, Deserialize)]
struct StoredDocument {
    id: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

/// Record store persisted as JSON files on local disk
pub struct JsonFileStore {
    data_dir: PathBuf,
    /// Serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open a store rooted at `data_dir`, creating the directory if needed
    pub fn open(data_dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self {
            data_dir,
            lock: Mutex::new(()),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn collection_path(&self, collection: &str) -> StoreResult<PathBuf> {
        let valid = !collection.is_empty()
            && collection
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidCollection(collection.to_string()));
        }
        Ok(self.data_dir.join(format!("{}.json", collection)))
    }

    fn load(path: &Path) -> StoreResult<Vec<StoredDocument>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(path: &Path, documents: &[StoredDocument]) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(documents)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Run file work off the async executor
async fn blocking<T, F>(work: F) -> StoreResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("file store task failed: {}", e),
        ))
    })?
}

#[async_trait]
impl RecordStore for JsonFileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn list(&self, collection: &str) -> StoreResult<Vec<CaseRecord>> {
        let path = self.collection_path(collection)?;
        let _guard = self.lock.lock().await;

        let documents = blocking(move || Self::load(&path)).await?;
        Ok(documents
            .iter()
            .map(|doc| CaseRecord::from_document(doc.id.clone(), &doc.fields))
            .collect())
    }

    async fn insert(&self, collection: &str, record: &NewCaseRecord) -> StoreResult<String> {
        let path = self.collection_path(collection)?;
        let _guard = self.lock.lock().await;

        let id = uuid::Uuid::new_v4().simple().to_string();
        let document = StoredDocument {
            id: id.clone(),
            fields: record.to_document(),
        };
        blocking(move || {
            let mut documents = Self::load(&path)?;
            documents.push(document);
            Self::save(&path, &documents)
        })
        .await?;

        tracing::debug!(collection = %collection, id = %id, "Record written to file store");
        Ok(id)
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let path = self.collection_path(collection)?;
        let _guard = self.lock.lock().await;

        let id = id.to_string();
        blocking(move || {
            let mut documents = Self::load(&path)?;
            let before = documents.len();
            documents.retain(|doc| doc.id != id);
            if documents.len() == before {
                return Err(StoreError::NotFound(id));
            }
            Self::save(&path, &documents)
        })
        .await
    }

    async fn health_check(&self, _collection: &str) -> StoreResult<()> {
        if self.data_dir.is_dir() {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_records_persist_across_instances() {
        let dir = tempdir().unwrap();

        let id = {
            let store = JsonFileStore::open(dir.path()).unwrap();
            store
                .insert("cases", &NewCaseRecord::new("Manila", "NCR").cases(5))
                .await
                .unwrap()
        };

        let store = JsonFileStore::open(dir.path()).unwrap();
        let records = store.list("cases").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].cases, 5);
        assert!(dir.path().join("cases.json").exists());
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        let keep = store
            .insert("cases", &NewCaseRecord::new("A", ""))
            .await
            .unwrap();
        let removed = store
            .insert("cases", &NewCaseRecord::new("B", ""))
            .await
            .unwrap();

        store.delete("cases", &removed).await.unwrap();
        let records = store.list("cases").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, keep);

        let err = store.delete("cases", &removed).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rejects_path_like_collection() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        let err = store.list("../escape").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidCollection(_)));
    }

    #[tokio::test]
    async fn test_hand_edited_file_is_coerced() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("cases.json"),
            r#"[{"id": "h1", "fields": {"location": "Iligan", "cases": "11", "date": "bad"}}]"#,
        )
        .unwrap();

        let store = JsonFileStore::open(dir.path()).unwrap();
        let records = store.list("cases").await.unwrap();
        assert_eq!(records[0].cases, 11);
        assert_eq!(records[0].date, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_all_persist() {
        let dir = tempdir().unwrap();
        let store = std::sync::Arc::new(JsonFileStore::open(dir.path()).unwrap());

        let mut handles = Vec::new();
        for i in 0..16u64 {
            let store = std::sync::Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .insert("cases", &NewCaseRecord::new(format!("Town{}", i), "").cases(i))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let reopened = JsonFileStore::open(dir.path()).unwrap();
        let mut cases: Vec<u64> = reopened
            .list("cases")
            .await
            .unwrap()
            .iter()
            .map(|r| r.cases)
            .collect();
        cases.sort_unstable();
        assert_eq!(cases, (0..16).collect::<Vec<u64>>());
        assert!(!dir.path().join("cases.json.tmp").exists());
    }
}
