//! Background repository analysis
//!
//! An analysis clones a repository (or reuses an existing clone), reads its
//! first-parent history and keeps an evenly spaced sample of commits. Runs
//! happen on spawned tasks; callers poll [`AnalysisTracker`] for progress.

use crate::clock::Clock;
use crate::error::AnalysisError;
use crate::git::{CommitInfo, GitWalker, RepoProvider, sample};
use crate::validation::RepoParams;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

/// Phase of an analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Cloning,
    Analyzing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    /// Completed or failed runs never change again
    pub fn is_terminal(self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Cloning => "cloning",
            AnalysisStatus::Analyzing => "analyzing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }
}

/// Outcome of a finished run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub status: AnalysisStatus,
    pub commits: Vec<CommitInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Last known state of the analysis for one repository
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisState {
    pub status: AnalysisStatus,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    pub started_at: DateTime<Utc>,
}

/// Response of `POST /api/analysis/start`
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisStartResponse {
    pub key: String,
    pub status: AnalysisStatus,
    pub progress: u8,
    pub message: String,
}

/// Response of `GET /api/analysis/status`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStatusResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// An [`AnalysisStatus`] or `not_found`
    pub status: String,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl AnalysisStatusResponse {
    pub fn not_found() -> Self {
        Self {
            key: None,
            status: "not_found".to_string(),
            progress: 0,
            message: "No analysis found for this repository".to_string(),
            result: None,
            started_at: None,
        }
    }

    fn from_state(key: String, state: AnalysisState) -> Self {
        Self {
            key: Some(key),
            status: state.status.as_str().to_string(),
            progress: state.progress,
            message: state.message,
            result: state.result,
            started_at: Some(state.started_at),
        }
    }
}

/// Per-repository analysis states
///
/// Records are written only by the run that owns them and read by pollers.
pub struct AnalysisTracker {
    states: RwLock<HashMap<String, AnalysisState>>,
    clock: Arc<dyn Clock>,
}

impl AnalysisTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub async fn get(&self, key: &str) -> Option<AnalysisState> {
        self.states.read().await.get(key).cloned()
    }

    /// Claim `key` for a new run
    ///
    /// Returns `Err` with the current state when a run is still in flight;
    /// otherwise resets the record to pending.
    async fn begin(&self, key: &str) -> Result<AnalysisState, AnalysisState> {
        let mut states = self.states.write().await;
        if let Some(existing) = states.get(key)
            && !existing.status.is_terminal()
        {
            return Err(existing.clone());
        }

        let state = AnalysisState {
            status: AnalysisStatus::Pending,
            progress: 0,
            message: "Starting analysis...".to_string(),
            result: None,
            started_at: self.clock.now(),
        };
        states.insert(key.to_string(), state.clone());
        Ok(state)
    }

    async fn update(&self, key: &str, status: AnalysisStatus, progress: u8, message: impl Into<String>) {
        let message = message.into();
        let now = self.clock.now();
        let mut states = self.states.write().await;
        let state = states.entry(key.to_string()).or_insert_with(|| AnalysisState {
            status,
            progress,
            message: String::new(),
            result: None,
            started_at: now,
        });
        state.status = status;
        state.progress = progress;
        state.message = message;
    }

    /// Record the terminal state and result of a run in one write
    async fn finish(&self, key: &str, progress: u8, message: String, result: AnalysisResult) {
        let now = self.clock.now();
        let mut states = self.states.write().await;
        let started_at = states.get(key).map(|s| s.started_at).unwrap_or(now);
        states.insert(
            key.to_string(),
            AnalysisState {
                status: result.status,
                progress,
                message,
                result: Some(result),
                started_at,
            },
        );
    }
}

/// Starts analyses and reports their state
#[derive(Clone)]
pub struct AnalysisService {
    tracker: Arc<AnalysisTracker>,
    provider: Arc<dyn RepoProvider>,
    max_commits: usize,
}

impl AnalysisService {
    pub fn new(tracker: Arc<AnalysisTracker>, provider: Arc<dyn RepoProvider>, max_commits: usize) -> Self {
        Self {
            tracker,
            provider,
            max_commits,
        }
    }

    pub fn tracker(&self) -> &Arc<AnalysisTracker> {
        &self.tracker
    }

    /// Start an analysis in the background unless one is already running
    pub async fn start(&self, params: &RepoParams) -> AnalysisStartResponse {
        let key = params.key();

        match self.tracker.begin(&key).await {
            Err(existing) => AnalysisStartResponse {
                key,
                status: existing.status,
                progress: existing.progress,
                message: "Analysis already in progress".to_string(),
            },
            Ok(state) => {
                let service = self.clone();
                let params = params.clone();
                tokio::spawn(async move {
                    service.run(&params).await;
                });

                info!("Started analysis of {}", key);
                AnalysisStartResponse {
                    key,
                    status: state.status,
                    progress: state.progress,
                    message: "Analysis started".to_string(),
                }
            }
        }
    }

    /// State of the analysis for `params`, or `not_found`
    pub async fn status(&self, params: &RepoParams) -> AnalysisStatusResponse {
        let key = params.key();
        match self.tracker.get(&key).await {
            Some(state) => AnalysisStatusResponse::from_state(key, state),
            None => AnalysisStatusResponse::not_found(),
        }
    }

    /// Run an analysis to completion, recording progress along the way
    pub async fn run(&self, params: &RepoParams) -> AnalysisResult {
        let key = params.key();

        let (result, progress, message) = match self.sample_history(&key, params).await {
            Ok(commits) => {
                let message = format!("Analysis completed with {} commits", commits.len());
                info!("Analysis of {} completed with {} commits", key, commits.len());
                let result = AnalysisResult {
                    status: AnalysisStatus::Completed,
                    commits,
                    error: None,
                };
                (result, 100, message)
            }
            Err(e) => {
                let reason = e.to_string();
                error!("Analysis of {} failed: {}", key, reason);
                let message = format!("Analysis failed: {}", reason);
                let result = AnalysisResult {
                    status: AnalysisStatus::Failed,
                    commits: Vec::new(),
                    error: Some(reason),
                };
                (result, 0, message)
            }
        };

        self.tracker.finish(&key, progress, message, result.clone()).await;
        result
    }

    async fn sample_history(&self, key: &str, params: &RepoParams) -> Result<Vec<CommitInfo>, AnalysisError> {
        self.tracker
            .update(key, AnalysisStatus::Cloning, 0, "Checking repository...")
            .await;

        if self.provider.is_cached(&params.owner, &params.repo) {
            self.tracker
                .update(key, AnalysisStatus::Cloning, 20, "Using cached repository...")
                .await;
        } else {
            self.tracker
                .update(key, AnalysisStatus::Cloning, 10, "Cloning repository...")
                .await;
        }
        let local = self.provider.ensure(&params.owner, &params.repo).await?;

        self.tracker
            .update(key, AnalysisStatus::Analyzing, 40, "Analyzing commit history...")
            .await;

        let max_commits = self.max_commits;
        let commits = tokio::task::spawn_blocking(move || {
            let history = GitWalker::open(&local.path)?.first_parent_history()?;
            Ok::<_, AnalysisError>(sample(&history, max_commits))
        })
        .await
        .map_err(|e| AnalysisError::Aborted(e.to_string()))??;

        if commits.is_empty() {
            return Err(AnalysisError::EmptyHistory);
        }
        Ok(commits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::git::LocalRepo;
    use git2::{Repository, Signature};
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    /// Serves a fixed local path, optionally waiting for a signal first
    struct FixedProvider {
        path: PathBuf,
        cached: bool,
        gate: Option<Arc<Notify>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl RepoProvider for FixedProvider {
        fn is_cached(&self, _: &str, _: &str) -> bool {
            self.cached
        }

        async fn ensure(&self, owner: &str, repo: &str) -> Result<LocalRepo, AnalysisError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail {
                return Err(AnalysisError::CloneFailed {
                    repo: format!("{}/{}", owner, repo),
                    reason: "authentication required".to_string(),
                });
            }
            Ok(LocalRepo {
                path: self.path.clone(),
                reused: self.cached,
            })
        }
    }

    fn repo_with_commits(count: i64) -> TempDir {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let mut parent: Option<git2::Oid> = None;
        for i in 0..count {
            let sig = Signature::new("Mona", "mona@example.com", &git2::Time::new(1_600_000_000 + i * 60, 0)).unwrap();
            let tree = repo.find_tree(repo.index().unwrap().write_tree().unwrap()).unwrap();
            let parents: Vec<git2::Commit> = parent.map(|p| vec![repo.find_commit(p).unwrap()]).unwrap_or_default();
            let refs: Vec<&git2::Commit> = parents.iter().collect();
            parent = Some(
                repo.commit(Some("HEAD"), &sig, &sig, &format!("commit {}", i), &tree, &refs)
                    .unwrap(),
            );
        }
        dir
    }

    fn service(provider: FixedProvider) -> AnalysisService {
        let tracker = Arc::new(AnalysisTracker::new(Arc::new(ManualClock::default())));
        AnalysisService::new(tracker, Arc::new(provider), 10)
    }

    fn params() -> RepoParams {
        RepoParams {
            owner: "octocat".to_string(),
            repo: "hello".to_string(),
        }
    }

    /// Yield until the spawned run reaches a terminal state; the history walk
    /// runs on the blocking pool, so the bound is a deadline rather than a count
    async fn wait_for_terminal(service: &AnalysisService) -> AnalysisStatusResponse {
        let poll = async {
            loop {
                let status = service.status(&params()).await;
                if status.status == "completed" || status.status == "failed" {
                    return status;
                }
                tokio::task::yield_now().await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), poll)
            .await
            .expect("analysis did not finish")
    }

    #[tokio::test]
    async fn test_run_samples_history() {
        let repo = repo_with_commits(25);
        let service = service(FixedProvider {
            path: repo.path().to_path_buf(),
            cached: true,
            gate: None,
            fail: false,
        });
        service.tracker().begin("octocat/hello").await.unwrap();

        let result = service.run(&params()).await;

        assert_eq!(result.status, AnalysisStatus::Completed);
        assert_eq!(result.commits.len(), 10);
        assert_eq!(result.commits[0].message, "commit 0");
        assert_eq!(result.commits[9].message, "commit 24");

        let state = service.tracker().get("octocat/hello").await.unwrap();
        assert_eq!(state.progress, 100);
        assert_eq!(state.message, "Analysis completed with 10 commits");
        assert!(state.result.is_some());
    }

    #[tokio::test]
    async fn test_empty_history_fails() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let service = service(FixedProvider {
            path: dir.path().to_path_buf(),
            cached: true,
            gate: None,
            fail: false,
        });

        let result = service.run(&params()).await;

        assert_eq!(result.status, AnalysisStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("No commits found in repository"));
        let state = service.tracker().get("octocat/hello").await.unwrap();
        assert_eq!(state.status, AnalysisStatus::Failed);
        assert_eq!(state.progress, 0);
        assert_eq!(state.message, "Analysis failed: No commits found in repository");
    }

    #[tokio::test]
    async fn test_clone_failure_is_recorded() {
        let service = service(FixedProvider {
            path: PathBuf::from("/nonexistent"),
            cached: false,
            gate: None,
            fail: true,
        });

        let started = service.start(&params()).await;
        assert_eq!(started.status, AnalysisStatus::Pending);
        assert_eq!(started.message, "Analysis started");

        let status = wait_for_terminal(&service).await;
        assert_eq!(status.status, "failed");
        assert!(status.message.starts_with("Analysis failed: Failed to clone octocat/hello"));
    }

    #[tokio::test]
    async fn test_start_is_idempotent_while_running() {
        let repo = repo_with_commits(3);
        let gate = Arc::new(Notify::new());
        let service = service(FixedProvider {
            path: repo.path().to_path_buf(),
            cached: false,
            gate: Some(gate.clone()),
            fail: false,
        });

        let first = service.start(&params()).await;
        assert_eq!(first.message, "Analysis started");

        let second = service.start(&params()).await;
        assert_eq!(second.message, "Analysis already in progress");
        assert_eq!(second.key, "octocat/hello");
        assert!(!second.status.is_terminal());

        gate.notify_one();
        let status = wait_for_terminal(&service).await;
        assert_eq!(status.status, "completed");
        assert_eq!(status.result.unwrap().commits.len(), 3);

        // A finished run can be restarted
        let restarted = service.start(&params()).await;
        assert_eq!(restarted.message, "Analysis started");
        gate.notify_one();
        wait_for_terminal(&service).await;
    }

    #[tokio::test]
    async fn test_status_not_found() {
        let service = service(FixedProvider {
            path: PathBuf::new(),
            cached: false,
            gate: None,
            fail: false,
        });

        let status = service.status(&params()).await;
        assert_eq!(status.status, "not_found");
        assert_eq!(status.message, "No analysis found for this repository");
        assert!(status.key.is_none());

        let json = serde_json::to_value(&status).unwrap();
        assert!(json.get("key").is_none());
        assert_eq!(json["progress"], 0);
    }
}
