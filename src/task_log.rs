//! Append-only record of routed utterances.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::intent::{IntentCategory, Utterance};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: Uuid,
    pub input: String,
    pub category: IntentCategory,
    pub timestamp: DateTime<Utc>,
}

impl TaskRecord {
    pub fn new(input: impl Into<String>, category: IntentCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            input: input.into(),
            category,
            timestamp: Utc::now(),
        }
    }
}

/// Persistence backend for [`TaskLog`].
#[async_trait]
pub trait TaskHistoryStore: Send + Sync {
    async fn append(&self, record: TaskRecord) -> anyhow::Result<()>;

    async fn clear(&self) -> anyhow::Result<()>;

    /// All records, oldest first.
    async fn list(&self) -> anyhow::Result<Vec<TaskRecord>>;
}

#[derive(Default)]
pub struct InMemoryTaskStore {
    records: Mutex<Vec<TaskRecord>>,
}

#[async_trait]
impl TaskHistoryStore for InMemoryTaskStore {
    async fn append(&self, record: TaskRecord) -> anyhow::Result<()> {
        self.records.lock().await.push(record);
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        self.records.lock().await.clear();
        Ok(())
    }

    async fn list(&self) -> anyhow::Result<Vec<TaskRecord>> {
        Ok(self.records.lock().await.clone())
    }
}

/// Records kept as a JSON array in one file.
///
/// Writes go to a sibling temp file which then replaces the original, so a
/// crash mid-write leaves the previous history intact.
pub struct JsonFileTaskStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileTaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> anyhow::Result<Vec<TaskRecord>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, records: &[TaskRecord]) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(records)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        trace!(path = %self.path.display(), count = records.len(), "task history written");
        Ok(())
    }
}

#[async_trait]
impl TaskHistoryStore for JsonFileTaskStore {
    async fn append(&self, record: TaskRecord) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        let mut records = self.read().await?;
        records.push(record);
        self.write(&records).await
    }

    async fn clear(&self) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        self.write(&[]).await
    }

    async fn list(&self) -> anyhow::Result<Vec<TaskRecord>> {
        let _guard = self.lock.lock().await;
        self.read().await
    }
}

#[derive(Clone)]
pub struct TaskLog {
    store: Arc<dyn TaskHistoryStore>,
}

impl TaskLog {
    pub fn new(store: Arc<dyn TaskHistoryStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryTaskStore::default()))
    }

    pub async fn record(&self, utterance: &Utterance, category: IntentCategory) -> anyhow::Result<TaskRecord> {
        let record = TaskRecord::new(utterance.text(), category);
        debug!(id = %record.id, %category, "recording task");
        self.store.append(record.clone()).await?;
        Ok(record)
    }

    pub async fn list(&self) -> anyhow::Result<Vec<TaskRecord>> {
        self.store.list().await
    }

    pub async fn clear(&self) -> anyhow::Result<()> {
        self.store.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn in_memory_keeps_order() {
        let log = TaskLog::in_memory();
        log.record(&"first".into(), IntentCategory::QA).await.unwrap();
        log.record(&"call John".into(), IntentCategory::ContactCall).await.unwrap();
        let records = log.list().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].input, "call John");
        assert_eq!(records[1].category, IntentCategory::ContactCall);
        assert_ne!(records[0].id, records[1].id);
    }

    #[tokio::test]
    async fn json_file_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("tasks.json");
        let log = TaskLog::new(Arc::new(JsonFileTaskStore::new(&path)));
        let saved = log.record(&"open youtube".into(), IntentCategory::OpenApp).await.unwrap();

        let reopened = TaskLog::new(Arc::new(JsonFileTaskStore::new(&path)));
        let records = reopened.list().await.unwrap();
        assert_eq!(records, vec![saved]);

        reopened.clear().await.unwrap();
        assert!(reopened.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_or_empty_file_is_empty_history() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let store = JsonFileTaskStore::new(&path);
        assert!(store.list().await.unwrap().is_empty());
        tokio::fs::write(&path, b"  \n").await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();
        let store = JsonFileTaskStore::new(&path);
        assert!(store.append(TaskRecord::new("x", IntentCategory::QA)).await.is_err());
    }
}
