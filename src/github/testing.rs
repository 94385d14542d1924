//! In-memory [`SourceApi`] for unit tests

use super::*;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixture-backed source. Unset collections answer empty, an unset
/// repository answers not-found.
#[derive(Default)]
pub(crate) struct FakeSource {
    pub tags: Vec<Tag>,
    pub commits: HashMap<String, CommitDetail>,
    pub trees: HashMap<String, GitTree>,
    pub failing_commits: HashSet<String>,
    pub tags_unavailable: bool,
    pub repository: Option<Repository>,
    pub languages: Option<BTreeMap<String, u64>>,
    pub contributors: Vec<Contributor>,
    pub recent_commits: Vec<CommitDetail>,
    pub branches: Vec<Branch>,
    pub releases: Vec<Release>,
    pub search: SearchResults,
    pub tag_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub commits_in_flight: AtomicUsize,
    pub max_commits_in_flight: AtomicUsize,
    pub requested_per_page: Mutex<Vec<u32>>,
}

pub(crate) fn commit_detail(sha: &str, message: &str, date: DateTime<Utc>) -> CommitDetail {
    CommitDetail {
        sha: sha.to_string(),
        commit: CommitPayload {
            message: message.to_string(),
            author: Signature {
                name: "Mona".to_string(),
                email: "mona@example.com".to_string(),
                date,
            },
            committer: None,
        },
        author: None,
    }
}

pub(crate) fn blob(path: &str, size: Option<u64>) -> TreeItem {
    TreeItem {
        path: path.to_string(),
        mode: "100644".to_string(),
        kind: TreeItemKind::Blob,
        sha: format!("blob-{}", path),
        size,
    }
}

pub(crate) fn dir(path: &str) -> TreeItem {
    TreeItem {
        path: path.to_string(),
        mode: "040000".to_string(),
        kind: TreeItemKind::Tree,
        sha: format!("tree-{}", path),
        size: None,
    }
}

impl FakeSource {
    /// Add a tag whose commit has the given date and whose tree holds `files` plus a `src` folder
    pub fn with_tag(mut self, name: &str, sha: &str, date: DateTime<Utc>, files: &[(&str, u64)]) -> Self {
        self.tags.push(Tag {
            name: name.to_string(),
            commit: TagCommit {
                sha: sha.to_string(),
            },
        });
        self.commits.insert(
            sha.to_string(),
            commit_detail(sha, &format!("Release {}\n\nDetails", name), date),
        );

        let mut tree: Vec<TreeItem> = files.iter().map(|(path, size)| blob(path, Some(*size))).collect();
        tree.push(dir("src"));
        self.trees.insert(
            sha.to_string(),
            GitTree {
                sha: sha.to_string(),
                tree,
                truncated: false,
            },
        );
        self
    }

    pub fn failing_commit(mut self, sha: &str) -> Self {
        self.failing_commits.insert(sha.to_string());
        self
    }

    pub fn tag_calls(&self) -> usize {
        self.tag_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// Highest number of commit lookups that were pending at the same time
    pub fn max_commits_in_flight(&self) -> usize {
        self.max_commits_in_flight.load(Ordering::SeqCst)
    }
}

fn not_found(what: &str) -> UpstreamError {
    UpstreamError::NotFound(what.to_string())
}

fn unavailable(what: &str) -> UpstreamError {
    UpstreamError::Status {
        url: what.to_string(),
        status: 503,
    }
}

#[async_trait::async_trait]
impl SourceApi for FakeSource {
    async fn list_tags(&self, _: &str, _: &str, per_page: u32) -> Result<Vec<Tag>, UpstreamError> {
        self.tag_calls.fetch_add(1, Ordering::SeqCst);
        self.requested_per_page.lock().unwrap().push(per_page);
        if self.tags_unavailable {
            return Err(unavailable("tags"));
        }
        Ok(self.tags.clone())
    }

    async fn commit_detail(&self, _: &str, _: &str, sha: &str) -> Result<CommitDetail, UpstreamError> {
        // Stay pending for one poll so lookups started together overlap
        let running = self.commits_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_commits_in_flight.fetch_max(running, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.commits_in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_commits.contains(sha) {
            return Err(UpstreamError::Request {
                url: format!("commits/{}", sha),
                reason: "connection reset".to_string(),
            });
        }
        self.commits.get(sha).cloned().ok_or_else(|| not_found(sha))
    }

    async fn tree(&self, _: &str, _: &str, sha: &str) -> Result<GitTree, UpstreamError> {
        self.trees.get(sha).cloned().ok_or_else(|| not_found(sha))
    }

    async fn repository(&self, owner: &str, repo: &str) -> Result<Repository, UpstreamError> {
        self.repository
            .clone()
            .ok_or_else(|| not_found(&format!("{}/{}", owner, repo)))
    }

    async fn languages(&self, _: &str, _: &str) -> Result<BTreeMap<String, u64>, UpstreamError> {
        self.languages.clone().ok_or_else(|| unavailable("languages"))
    }

    async fn contributors(&self, _: &str, _: &str, _: u32) -> Result<Vec<Contributor>, UpstreamError> {
        Ok(self.contributors.clone())
    }

    async fn recent_commits(&self, _: &str, _: &str, _: u32) -> Result<Vec<CommitDetail>, UpstreamError> {
        Ok(self.recent_commits.clone())
    }

    async fn branches(&self, _: &str, _: &str, _: u32) -> Result<Vec<Branch>, UpstreamError> {
        Ok(self.branches.clone())
    }

    async fn releases(&self, _: &str, _: &str, _: u32) -> Result<Vec<Release>, UpstreamError> {
        Ok(self.releases.clone())
    }

    async fn search_repositories(&self, _: &str, _: u32) -> Result<SearchResults, UpstreamError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.search.clone())
    }
}
