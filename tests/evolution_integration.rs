/// End-to-end tests of the evolution pipeline over a file-backed store
use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Duration, TimeZone, Utc};
use git_wayback::clock::ManualClock;
use git_wayback::config::Config;
use git_wayback::error::{AnalysisError, UpstreamError};
use git_wayback::evolution::{EvolutionService, JsonFileSnapshotStore, SnapshotFetcher};
use git_wayback::git::{LocalRepo, RepoProvider};
use git_wayback::github::*;
use git_wayback::server::{AppState, Backends, create_router};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tower::ServiceExt;

/// Two tags, v1 and v2, each with a README and a source file
#[derive(Default)]
struct TwoTagSource {
    failing_sha: Option<&'static str>,
    tag_calls: AtomicUsize,
}

fn tag_date(sha: &str) -> DateTime<Utc> {
    match sha {
        "1111111" => Utc.with_ymd_and_hms(2023, 1, 15, 10, 0, 0).unwrap(),
        _ => Utc.with_ymd_and_hms(2023, 8, 1, 10, 0, 0).unwrap(),
    }
}

fn item(path: &str, kind: TreeItemKind, size: Option<u64>) -> TreeItem {
    TreeItem {
        path: path.to_string(),
        mode: String::new(),
        kind,
        sha: String::new(),
        size,
    }
}

#[async_trait]
impl SourceApi for TwoTagSource {
    async fn list_tags(&self, _: &str, _: &str, _: u32) -> Result<Vec<Tag>, UpstreamError> {
        self.tag_calls.fetch_add(1, Ordering::SeqCst);
        Ok(["v2:2222222", "v1:1111111"]
            .iter()
            .filter_map(|s| s.split_once(':'))
            .map(|(name, sha)| Tag {
                name: name.to_string(),
                commit: TagCommit {
                    sha: sha.to_string(),
                },
            })
            .collect())
    }

    async fn commit_detail(&self, _: &str, _: &str, sha: &str) -> Result<CommitDetail, UpstreamError> {
        if self.failing_sha == Some(sha) {
            return Err(UpstreamError::Status {
                url: format!("commits/{}", sha),
                status: 500,
            });
        }
        Ok(CommitDetail {
            sha: sha.to_string(),
            commit: CommitPayload {
                message: format!("Commit {}\n\nbody", sha),
                author: Signature {
                    name: "Mona".to_string(),
                    email: "mona@example.com".to_string(),
                    date: tag_date(sha),
                },
                committer: None,
            },
            author: None,
        })
    }

    async fn tree(&self, _: &str, _: &str, sha: &str) -> Result<GitTree, UpstreamError> {
        let grown = if sha == "2222222" { 2 } else { 1 };
        Ok(GitTree {
            sha: sha.to_string(),
            truncated: false,
            tree: vec![
                item("README.md", TreeItemKind::Blob, Some(100 * grown)),
                item("src", TreeItemKind::Tree, None),
                item("src/main.rs", TreeItemKind::Blob, Some(1000 * grown)),
            ],
        })
    }

    async fn repository(&self, owner: &str, repo: &str) -> Result<Repository, UpstreamError> {
        Err(UpstreamError::NotFound(format!("{}/{}", owner, repo)))
    }

    async fn languages(&self, _: &str, _: &str) -> Result<BTreeMap<String, u64>, UpstreamError> {
        Ok(BTreeMap::new())
    }

    async fn contributors(&self, _: &str, _: &str, _: u32) -> Result<Vec<Contributor>, UpstreamError> {
        Ok(Vec::new())
    }

    async fn recent_commits(&self, _: &str, _: &str, _: u32) -> Result<Vec<CommitDetail>, UpstreamError> {
        Ok(Vec::new())
    }

    async fn branches(&self, _: &str, _: &str, _: u32) -> Result<Vec<Branch>, UpstreamError> {
        Ok(Vec::new())
    }

    async fn releases(&self, _: &str, _: &str, _: u32) -> Result<Vec<Release>, UpstreamError> {
        Ok(Vec::new())
    }

    async fn search_repositories(&self, _: &str, _: u32) -> Result<SearchResults, UpstreamError> {
        Ok(SearchResults::default())
    }
}

struct NoClones;

#[async_trait]
impl RepoProvider for NoClones {
    fn is_cached(&self, _: &str, _: &str) -> bool {
        false
    }

    async fn ensure(&self, owner: &str, repo: &str) -> Result<LocalRepo, AnalysisError> {
        Err(AnalysisError::CloneFailed {
            repo: format!("{}/{}", owner, repo),
            reason: "disabled in tests".to_string(),
        })
    }
}

fn service(source: Arc<TwoTagSource>, store: JsonFileSnapshotStore, clock: &ManualClock) -> EvolutionService {
    EvolutionService::new(
        SnapshotFetcher::new(source, 5),
        Arc::new(store),
        Arc::new(clock.clone()),
        Duration::hours(24),
    )
}

fn clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
}

#[tokio::test]
async fn test_snapshots_survive_restart() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("evolution.json");
    let source = Arc::new(TwoTagSource::default());
    let clock = clock();

    let first = service(source.clone(), JsonFileSnapshotStore::open(&path)?, &clock)
        .get_evolution("octocat", "hello", 20, false)
        .await?;

    assert!(!first.cached);
    assert_eq!(first.snapshots.len(), 2);
    assert_eq!(first.snapshots[0].tag, "v1");
    assert_eq!(first.snapshots[0].message, "Commit 1111111");
    assert_eq!(first.snapshots[0].stats.total_files, 2);
    assert_eq!(first.snapshots[1].stats.total_size, 2200);

    // A fresh process reading the same file serves the record without refetching
    clock.advance(Duration::hours(2));
    let reopened = service(source.clone(), JsonFileSnapshotStore::open(&path)?, &clock)
        .get_evolution("octocat", "hello", 20, false)
        .await?;

    assert!(reopened.cached);
    assert_eq!(reopened.snapshots, first.snapshots);
    assert_eq!(reopened.captured_at, first.captured_at);
    assert_eq!(source.tag_calls.load(Ordering::SeqCst), 1);

    Ok(())
}

#[tokio::test]
async fn test_failed_commit_leaves_remaining_tags() -> Result<()> {
    let dir = TempDir::new()?;
    let source = Arc::new(TwoTagSource {
        failing_sha: Some("1111111"),
        ..TwoTagSource::default()
    });
    let clock = clock();
    let store = JsonFileSnapshotStore::open(dir.path().join("evolution.json"))?;

    let result = service(source, store, &clock)
        .get_evolution("octocat", "hello", 20, false)
        .await?;

    let tags: Vec<_> = result.snapshots.iter().map(|s| s.tag.as_str()).collect();
    assert_eq!(tags, vec!["v2"]);

    Ok(())
}

#[tokio::test]
async fn test_api_with_persistent_store_is_healthy() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("evolution.json");

    let mut config = Config::default();
    config.store.path = Some(path.clone());
    config.github.token = Some("test-token".to_string());

    let clock = clock();
    let state = AppState::new(
        config,
        Backends {
            source: Arc::new(TwoTagSource::default()),
            store: Arc::new(JsonFileSnapshotStore::open(&path)?),
            repos: Arc::new(NoClones),
            clock: Arc::new(clock),
        },
    );
    let app = create_router(Arc::new(state));

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let health: serde_json::Value = serde_json::from_slice(&body)?;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["checks"]["githubToken"], true);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/repos/octocat/hello/evolution?limit=2")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let evolution: serde_json::Value = serde_json::from_slice(&body)?;
    assert_eq!(evolution["repoName"], "hello");
    assert_eq!(evolution["snapshots"][1]["files"][1]["path"], "src/main.rs");
    assert!(path.exists());

    Ok(())
}
