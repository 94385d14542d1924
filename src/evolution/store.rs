use crate::error::StoreError;
use crate::types::EvolutionRecord;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Keyed store for evolution records
///
/// `upsert` is insert-or-replace by `record.id`: the snapshots, tag count and
/// capture time are replaced wholesale, never merged. Concurrent upserts for
/// the same id resolve last-writer-wins.
#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Point lookup by `owner/name`
    async fn get(&self, id: &str) -> Result<Option<EvolutionRecord>, StoreError>;

    /// Insert or fully replace the record with the same id
    async fn upsert(&self, record: EvolutionRecord) -> Result<(), StoreError>;

    /// Whether records survive a restart
    fn is_persistent(&self) -> bool;
}

/// Replace `existing` with `incoming`, keeping the original creation time
fn merge_for_upsert(existing: Option<&EvolutionRecord>, mut incoming: EvolutionRecord) -> EvolutionRecord {
    if let Some(existing) = existing {
        incoming.created_at = existing.created_at;
    }
    incoming
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    records: RwLock<HashMap<String, EvolutionRecord>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn get(&self, id: &str) -> Result<Option<EvolutionRecord>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn upsert(&self, record: EvolutionRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let merged = merge_for_upsert(records.get(&record.id), record);
        records.insert(merged.id.clone(), merged);
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        false
    }
}

/// On-disk document layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    records: HashMap<String, EvolutionRecord>,
}

/// Store persisted as a single JSON document
///
/// The document is loaded once at open and rewritten on every upsert.
#[derive(Debug)]
pub struct JsonFileSnapshotStore {
    path: PathBuf,
    records: RwLock<HashMap<String, EvolutionRecord>>,
}

impl JsonFileSnapshotStore {
    /// Open the store at `path`, starting empty if the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = Self::load(&path).map_err(|e| StoreError::LoadFailed {
            path: path.display().to_string(),
            reason: format!("{:#}", e),
        })?;

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<HashMap<String, EvolutionRecord>> {
        if !path.exists() {
            tracing::debug!("Snapshot store not found, starting with empty store");
            return Ok(HashMap::new());
        }

        let content = std::fs::read_to_string(path).context("Failed to read snapshot store")?;
        let file: StoreFile =
            serde_json::from_str(&content).context("Failed to parse snapshot store")?;

        tracing::info!(
            "Loaded snapshot store with {} repositories",
            file.records.len()
        );
        Ok(file.records)
    }

    async fn save(&self, records: &HashMap<String, EvolutionRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create snapshot store directory")?;
        }

        let document = StoreFile {
            records: records.clone(),
        };
        let content =
            serde_json::to_string(&document).context("Failed to serialize snapshot store")?;

        // Write-then-rename so a crash never leaves a half-written document
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .context("Failed to write snapshot store")?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .context("Failed to replace snapshot store")?;

        tracing::debug!("Saved snapshot store to {:?}", self.path);
        Ok(())
    }
}

#[async_trait::async_trait]
impl SnapshotStore for JsonFileSnapshotStore {
    async fn get(&self, id: &str) -> Result<Option<EvolutionRecord>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn upsert(&self, record: EvolutionRecord) -> Result<(), StoreError> {
        // The write lock is held across the save so file order matches map order.
        // Memory only changes once the document is on disk.
        let mut records = self.records.write().await;
        let merged = merge_for_upsert(records.get(&record.id), record);
        let mut candidate = records.clone();
        candidate.insert(merged.id.clone(), merged);

        self.save(&candidate)
            .await
            .map_err(|e| StoreError::SaveFailed {
                path: self.path.display().to_string(),
                reason: format!("{:#}", e),
            })?;

        *records = candidate;
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        true
    }
}
