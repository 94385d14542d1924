use crate::error::AnalysisError;
use anyhow::Context;
use std::path::{Path, PathBuf};

/// A repository available on local disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRepo {
    pub path: PathBuf,
    /// Whether an existing clone was reused
    pub reused: bool,
}

/// Provides local clones of remote repositories
#[async_trait::async_trait]
pub trait RepoProvider: Send + Sync {
    /// Whether a local clone of `owner/repo` already exists
    fn is_cached(&self, owner: &str, repo: &str) -> bool;

    /// Return the local clone of `owner/repo`, cloning it first if absent
    async fn ensure(&self, owner: &str, repo: &str) -> Result<LocalRepo, AnalysisError>;
}

/// Clones GitHub repositories with git2 into `<root>/<owner>/<repo>`
#[derive(Debug, Clone)]
pub struct GitCloneProvider {
    root: PathBuf,
    base_url: String,
}

impl GitCloneProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            base_url: "https://github.com".to_string(),
        }
    }

    /// Clone from a different host, e.g. a local mirror in tests
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn repo_path(&self, owner: &str, repo: &str) -> PathBuf {
        self.root.join(owner).join(repo)
    }

    pub fn clone_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/{}/{}.git", self.base_url, owner, repo)
    }

    fn clone_blocking(url: &str, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create clone directory")?;
        }
        git2::Repository::clone(url, path).with_context(|| format!("Failed to clone {}", url))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RepoProvider for GitCloneProvider {
    fn is_cached(&self, owner: &str, repo: &str) -> bool {
        self.repo_path(owner, repo).exists()
    }

    async fn ensure(&self, owner: &str, repo: &str) -> Result<LocalRepo, AnalysisError> {
        let path = self.repo_path(owner, repo);
        if path.exists() {
            tracing::debug!("Reusing clone at {}", path.display());
            return Ok(LocalRepo { path, reused: true });
        }

        let url = self.clone_url(owner, repo);
        tracing::info!("Cloning {} into {}", url, path.display());

        let target = path.clone();
        let clone_failed = |reason: String| AnalysisError::CloneFailed {
            repo: crate::types::repo_key(owner, repo),
            reason,
        };

        tokio::task::spawn_blocking(move || Self::clone_blocking(&url, &target))
            .await
            .map_err(|e| clone_failed(e.to_string()))?
            .map_err(|e| clone_failed(format!("{:#}", e)))?;

        Ok(LocalRepo {
            path,
            reused: false,
        })
    }
}
