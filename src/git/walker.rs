use crate::error::GitError;
use chrono::{DateTime, TimeZone, Utc};
use git2::{Repository, Sort};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Information about a git commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitInfo {
    /// Full commit SHA hash (40 characters)
    pub sha: String,
    /// Commit message (first line and body)
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub author_date: DateTime<Utc>,
    /// Mirrors the author fields
    pub committer_name: String,
    pub committer_email: String,
    pub committer_date: DateTime<Utc>,
}

/// Git repository walker for extracting the mainline history
pub struct GitWalker {
    repo: Repository,
    repo_path: PathBuf,
}

impl GitWalker {
    /// Open the repository at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GitError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GitError::RepoNotFound(path.display().to_string()));
        }

        let repo = Repository::open(path).map_err(|e| GitError::OpenFailed(e.message().to_string()))?;

        tracing::debug!("Opened git repository at: {}", path.display());

        Ok(Self {
            repo,
            repo_path: path.to_path_buf(),
        })
    }

    /// Check if repository has any commits
    pub fn has_commits(&self) -> bool {
        self.repo.head().is_ok()
    }

    /// First-parent history of HEAD, oldest commit first
    ///
    /// Returns an empty list for a repository without commits.
    pub fn first_parent_history(&self) -> Result<Vec<CommitInfo>, GitError> {
        if !self.has_commits() {
            return Ok(Vec::new());
        }

        let mut revwalk = self.repo.revwalk()?;
        revwalk.simplify_first_parent()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)?;
        revwalk.push_head()?;

        let mut commits = Vec::new();
        for oid in revwalk {
            let commit = self.repo.find_commit(oid?)?;
            commits.push(Self::extract_commit_info(&commit)?);

            if commits.len() % 500 == 0 {
                tracing::debug!("Read {} commits", commits.len());
            }
        }

        tracing::info!(
            "Read {} first-parent commits from {}",
            commits.len(),
            self.repo_path.display()
        );
        Ok(commits)
    }

    fn extract_commit_info(commit: &git2::Commit) -> Result<CommitInfo, GitError> {
        let sha = commit.id().to_string();
        let message = commit.message().unwrap_or("").to_string();
        let author = commit.author();
        let author_name = author.name().unwrap_or("Unknown").to_string();
        let author_email = author.email().unwrap_or("").to_string();
        let author_date = Utc
            .timestamp_opt(author.when().seconds(), 0)
            .single()
            .ok_or_else(|| GitError::ParseFailed(format!("commit {} has an invalid date", sha)))?;

        Ok(CommitInfo {
            committer_name: author_name.clone(),
            committer_email: author_email.clone(),
            committer_date: author_date,
            sha,
            message,
            author_name,
            author_email,
            author_date,
        })
    }
}
