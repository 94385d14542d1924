//! Source repository API
//!
//! [`SourceApi`] is the read-only contract the evolution pipeline and the
//! overview endpoints depend on; [`GitHubClient`] implements it over the
//! GitHub REST API.

/// reqwest-backed GitHub REST client
pub mod client;
/// Wire types for GitHub REST responses
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::GitHubClient;
pub use types::*;

use crate::error::UpstreamError;
use std::collections::BTreeMap;

/// Page sizes used against the source API
pub mod per_page {
    pub const SEARCH: u32 = 10;
    pub const CONTRIBUTORS: u32 = 10;
    pub const COMMITS: u32 = 30;
    pub const BRANCHES: u32 = 100;
    pub const RELEASES: u32 = 10;
}

/// Trait for read-only repository-hosting API calls
#[async_trait::async_trait]
pub trait SourceApi: Send + Sync {
    /// Tags with their commit SHAs, in the order the source returns them
    async fn list_tags(
        &self,
        owner: &str,
        repo: &str,
        per_page: u32,
    ) -> Result<Vec<Tag>, UpstreamError>;

    /// Commit metadata for a SHA
    async fn commit_detail(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<CommitDetail, UpstreamError>;

    /// Full recursive tree for a commit SHA
    async fn tree(&self, owner: &str, repo: &str, sha: &str) -> Result<GitTree, UpstreamError>;

    /// Repository metadata
    async fn repository(&self, owner: &str, repo: &str) -> Result<Repository, UpstreamError>;

    /// Bytes of code per language
    async fn languages(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<BTreeMap<String, u64>, UpstreamError>;

    async fn contributors(
        &self,
        owner: &str,
        repo: &str,
        per_page: u32,
    ) -> Result<Vec<Contributor>, UpstreamError>;

    /// Most recent commits on the default branch
    async fn recent_commits(
        &self,
        owner: &str,
        repo: &str,
        per_page: u32,
    ) -> Result<Vec<CommitDetail>, UpstreamError>;

    async fn branches(
        &self,
        owner: &str,
        repo: &str,
        per_page: u32,
    ) -> Result<Vec<Branch>, UpstreamError>;

    async fn releases(
        &self,
        owner: &str,
        repo: &str,
        per_page: u32,
    ) -> Result<Vec<Release>, UpstreamError>;

    /// Repository search, sorted by stars descending
    async fn search_repositories(
        &self,
        query: &str,
        per_page: u32,
    ) -> Result<SearchResults, UpstreamError>;
}
