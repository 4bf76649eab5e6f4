//! Import progress tracking

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

/// Lifecycle of the most recent import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportState {
    #[default]
    Idle,
    Writing,
    Completed,
    /// Finished with at least one failed row
    Partial,
    /// Aborted before writing anything
    Failed,
}

/// Snapshot of the current or last import
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportStatus {
    pub state: ImportState,
    /// Rows queued for writing
    pub total: usize,
    pub written: usize,
    pub failed: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Progress sink shared between the importer and status readers
#[derive(Debug, Default)]
pub struct ImportProgress {
    status: RwLock<ImportStatus>,
}

impl ImportProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn begin(&self, total: usize) {
        *self.status.write().await = ImportStatus {
            state: ImportState::Writing,
            total,
            started_at: Some(Utc::now()),
            ..Default::default()
        };
    }

    pub async fn row_written(&self) {
        self.status.write().await.written += 1;
    }

    pub async fn row_failed(&self) {
        self.status.write().await.failed += 1;
    }

    pub async fn finish(&self) {
        let mut status = self.status.write().await;
        status.state = if status.failed == 0 {
            ImportState::Completed
        } else {
            ImportState::Partial
        };
        status.finished_at = Some(Utc::now());
    }

    /// Record an import that failed before writing
    pub async fn fail(&self, error: impl Into<String>) {
        let now = Utc::now();
        *self.status.write().await = ImportStatus {
            state: ImportState::Failed,
            started_at: Some(now),
            finished_at: Some(now),
            error: Some(error.into()),
            ..Default::default()
        };
    }

    pub async fn status(&self) -> ImportStatus {
        self.status.read().await.clone()
    }
}
