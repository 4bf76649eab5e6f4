//! Firestore REST Gateway
//!
//! Record store backed by the Firestore v1 documents REST API.
//!
//! Firestore wraps every field in a typed envelope (`{"integerValue": "3"}`,
//! `{"stringValue": "Manila"}`, ...). Documents are flattened to plain JSON
//! first and then decoded with [`CaseRecord::from_document`].

use super::{CaseRecord, NewCaseRecord, RecordStore, StoreError, StoreResult};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Configuration for the Firestore gateway
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// API root (e.g., "https://firestore.googleapis.com/v1")
    pub base_url: String,
    /// Google Cloud project id
    pub project_id: String,
    /// Database id, "(default)" for most projects
    pub database: String,
    /// Optional web API key appended as `?key=`
    pub api_key: Option<String>,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Documents per list page
    pub page_size: u32,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            base_url: "https://firestore.googleapis.com/v1".to_string(),
            project_id: String::new(),
            database: "(default)".to_string(),
            api_key: None,
            request_timeout_ms: 10_000,
            page_size: 300,
        }
    }
}

/// Firestore-backed record store
pub struct FirestoreStore {
    client: Client,
    config: FirestoreConfig,
}

impl FirestoreStore {
    /// Create a new gateway with the given configuration
    pub fn new(config: FirestoreConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents/{}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.config.project_id),
            urlencoding::encode(&self.config.database),
            urlencoding::encode(collection)
        )
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/{}",
            self.collection_url(collection),
            urlencoding::encode(id)
        )
    }

    fn with_key(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) if !key.is_empty() => request.query(&[("key", key.as_str())]),
            _ => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        let response = self
            .with_key(request)
            .send()
            .await
            .map_err(map_request_error)?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if status.as_u16() == 404 {
            Err(StoreError::NotFound(text))
        } else {
            Err(StoreError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    async fn list_page(
        &self,
        collection: &str,
        page_token: Option<&str>,
        page_size: u32,
    ) -> StoreResult<ListDocumentsResponse> {
        let mut request = self
            .client
            .get(self.collection_url(collection))
            .query(&[("pageSize", page_size.to_string())]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = self.send(request).await?;
        response.json().await.map_err(StoreError::Request)
    }
}

#[async_trait]
impl RecordStore for FirestoreStore {
    fn name(&self) -> &str {
        "firestore"
    }

    async fn list(&self, collection: &str) -> StoreResult<Vec<CaseRecord>> {
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_page(collection, page_token.as_deref(), self.config.page_size)
                .await?;

            records.extend(decode_documents(collection, &page.documents));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(
            collection = %collection,
            records = records.len(),
            "Listed Firestore collection"
        );
        Ok(records)
    }

    async fn insert(&self, collection: &str, record: &NewCaseRecord) -> StoreResult<String> {
        let body = WriteDocumentRequest {
            fields: encode_fields(&record.to_document()),
        };

        let response = self
            .send(self.client.post(self.collection_url(collection)).json(&body))
            .await?;
        let document: FirestoreDocument = response.json().await.map_err(StoreError::Request)?;

        Ok(document.id()?.to_string())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.send(self.client.delete(self.document_url(collection, id)))
            .await?;
        Ok(())
    }

    async fn health_check(&self, collection: &str) -> StoreResult<()> {
        self.list_page(collection, None, 1).await.map(|_| ())
    }
}

/// Decode a page of documents, skipping any that cannot be read
fn decode_documents(collection: &str, documents: &[FirestoreDocument]) -> Vec<CaseRecord> {
    documents
        .iter()
        .filter_map(|document| match document.to_record() {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(collection = %collection, error = %e, "Skipping unreadable document");
                None
            }
        })
        .collect()
}

fn map_request_error(e: reqwest::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::Timeout
    } else if e.is_connect() {
        StoreError::Unavailable
    } else {
        StoreError::Request(e)
    }
}

// ============================================
// Wire format
// ============================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<FirestoreDocument>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl FirestoreDocument {
    /// Document id is the last segment of the resource name
    fn id(&self) -> StoreResult<&str> {
        self.name
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StoreError::InvalidDocument(format!("bad name: {}", self.name)))
    }

    fn to_record(&self) -> StoreResult<CaseRecord> {
        let plain: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), decode_value(v)))
            .collect();
        Ok(CaseRecord::from_document(self.id()?, &plain))
    }
}

#[derive(Debug, Serialize)]
struct WriteDocumentRequest {
    fields: Map<String, Value>,
}

/// Flatten a typed Firestore value into plain JSON
fn decode_value(value: &Value) -> Value {
    let Some(obj) = value.as_object() else {
        return Value::Null;
    };

    if let Some(s) = obj.get("stringValue") {
        return s.clone();
    }
    if let Some(i) = obj.get("integerValue") {
        // int64 values arrive as decimal strings
        return match i {
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| i.clone()),
            other => other.clone(),
        };
    }
    if let Some(d) = obj.get("doubleValue") {
        return d.clone();
    }
    if let Some(b) = obj.get("booleanValue") {
        return b.clone();
    }
    if let Some(ts) = obj.get("timestampValue") {
        return ts.clone();
    }
    if let Some(map) = obj.get("mapValue") {
        let fields = map
            .get("fields")
            .and_then(Value::as_object)
            .map(|f| f.iter().map(|(k, v)| (k.clone(), decode_value(v))).collect())
            .unwrap_or_default();
        return Value::Object(fields);
    }
    if let Some(array) = obj.get("arrayValue") {
        let values = array
            .get("values")
            .and_then(Value::as_array)
            .map(|vs| vs.iter().map(decode_value).collect())
            .unwrap_or_default();
        return Value::Array(values);
    }

    Value::Null
}

/// Wrap plain JSON in Firestore's typed envelopes
fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) if n.is_i64() || n.is_u64() => json!({ "integerValue": n.to_string() }),
        Value::Number(n) => json!({ "doubleValue": n }),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(values) => {
            json!({ "arrayValue": { "values": values.iter().map(encode_value).collect::<Vec<_>>() } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

fn encode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect()
}
