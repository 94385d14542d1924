//! Tag evolution snapshots
//!
//! [`EvolutionService`] serves per-tag snapshots of a repository from the
//! [`SnapshotStore`] while they are younger than the cache TTL, and refetches
//! them through the [`SnapshotFetcher`] otherwise.

/// Batched snapshot fetching against the source API
pub mod fetcher;
/// Keyed evolution record stores
pub mod store;

pub use fetcher::SnapshotFetcher;
pub use store::{JsonFileSnapshotStore, MemorySnapshotStore, SnapshotStore};

use crate::clock::Clock;
use crate::error::Result;
use crate::types::{EvolutionRecord, EvolutionResult, repo_key};
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info};

/// Cache-or-refetch orchestration for evolution snapshots
#[derive(Clone)]
pub struct EvolutionService {
    fetcher: SnapshotFetcher,
    store: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl EvolutionService {
    pub fn new(
        fetcher: SnapshotFetcher,
        store: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            fetcher,
            store,
            clock,
            ttl,
        }
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Snapshots for `owner/repo`
    ///
    /// A fresh record is served without touching the source API unless
    /// `force_refresh` is set. A refetch that yields no snapshots is returned
    /// without being written to the store.
    pub async fn get_evolution(
        &self,
        owner: &str,
        repo: &str,
        limit: usize,
        force_refresh: bool,
    ) -> Result<EvolutionResult> {
        let id = repo_key(owner, repo);

        if !force_refresh && let Some(record) = self.store.get(&id).await? {
            let age = self.clock.now() - record.captured_at;
            if age < self.ttl {
                debug!(
                    "Serving cached evolution for {} (age: {} minutes)",
                    id,
                    age.num_minutes()
                );
                return Ok(EvolutionResult {
                    snapshots: record.snapshots,
                    cached: true,
                    captured_at: record.captured_at,
                });
            }
            debug!("Cached evolution for {} is stale, refetching", id);
        }

        info!(
            "Fetching evolution for {} (limit: {}, forced: {})",
            id, limit, force_refresh
        );
        let snapshots = self.fetcher.fetch(owner, repo, limit).await?;
        let now = self.clock.now();

        if !snapshots.is_empty() {
            let record = EvolutionRecord::new(owner, repo, snapshots.clone(), now);
            self.store.upsert(record).await?;
            info!("Saved {} snapshots for {}", snapshots.len(), id);
        }

        Ok(EvolutionResult {
            snapshots,
            cached: false,
            captured_at: now,
        })
    }
}
