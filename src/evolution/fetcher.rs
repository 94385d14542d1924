use crate::error::UpstreamError;
use crate::github::{SourceApi, Tag};
use crate::types::{FileEntry, Snapshot};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

/// Fetches per-tag snapshots from the source API
///
/// Tags are enriched in sequential batches; within a batch the commit detail
/// and tree requests for every tag run concurrently.
#[derive(Clone)]
pub struct SnapshotFetcher {
    api: Arc<dyn SourceApi>,
    batch_size: usize,
}

impl SnapshotFetcher {
    pub fn new(api: Arc<dyn SourceApi>, batch_size: usize) -> Self {
        Self {
            api,
            batch_size: batch_size.max(1),
        }
    }

    /// Snapshots for up to `limit` tags, ascending by commit date
    ///
    /// Failing to list tags is fatal. A tag whose enrichment fails is dropped
    /// with a warning.
    pub async fn fetch(
        &self,
        owner: &str,
        repo: &str,
        limit: usize,
    ) -> Result<Vec<Snapshot>, UpstreamError> {
        let per_page = u32::try_from(limit).unwrap_or(u32::MAX);
        let mut tags = self.api.list_tags(owner, repo, per_page).await?;
        tags.truncate(limit);

        if tags.is_empty() {
            info!("{}/{} has no tags", owner, repo);
            return Ok(Vec::new());
        }

        let mut snapshots = Vec::with_capacity(tags.len());

        for batch in tags.chunks(self.batch_size) {
            let results = join_all(batch.iter().map(|tag| self.fetch_tag(owner, repo, tag))).await;

            for (tag, result) in batch.iter().zip(results) {
                match result {
                    Ok(snapshot) => snapshots.push(snapshot),
                    Err(e) => warn!("Failed to fetch data for tag {}: {}", tag.name, e),
                }
            }
        }

        snapshots.sort_by_key(|s| s.date);

        info!(
            "Fetched {} of {} tag snapshots for {}/{}",
            snapshots.len(),
            tags.len(),
            owner,
            repo
        );
        Ok(snapshots)
    }

    async fn fetch_tag(&self, owner: &str, repo: &str, tag: &Tag) -> Result<Snapshot, UpstreamError> {
        let sha = tag.commit.sha.as_str();
        let (detail, tree) = tokio::try_join!(
            self.api.commit_detail(owner, repo, sha),
            self.api.tree(owner, repo, sha),
        )?;

        let files: Vec<FileEntry> = tree
            .blobs()
            .map(|item| FileEntry::from_path(item.path.clone(), item.size))
            .collect();

        Ok(Snapshot::new(
            tag.name.clone(),
            sha,
            detail.commit.author.date,
            &detail.commit.message,
            files,
        ))
    }
}
