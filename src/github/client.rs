use super::types::*;
use super::SourceApi;
use crate::config::GitHubConfig;
use crate::error::{ConfigError, UpstreamError, WaybackError};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

const GITHUB_API_VERSION: &str = "application/vnd.github.v3+json";

/// GitHub REST API client
///
/// Every request carries the configured User-Agent and, when a token is
/// configured, a bearer Authorization header.
#[derive(Clone)]
pub struct GitHubClient {
    http: Client,
    base_url: String,
    authenticated: bool,
}

impl GitHubClient {
    /// Build a client from configuration
    pub fn new(config: &GitHubConfig) -> Result<Self, WaybackError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_API_VERSION));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).map_err(|e| ConfigError::InvalidValue {
                key: "github.user_agent".to_string(),
                reason: e.to_string(),
            })?,
        );

        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
                ConfigError::InvalidValue {
                    key: "github.token".to_string(),
                    reason: e.to_string(),
                }
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WaybackError::other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            authenticated: config.token.is_some(),
        })
    }

    /// Whether requests carry a bearer token
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// URL of a repository resource, e.g. `repo_url("o", "r", "tags")`
    pub fn repo_url(&self, owner: &str, repo: &str, path: &str) -> String {
        let base = format!("{}/repos/{}/{}", self.base_url, owner, repo);
        if path.is_empty() {
            base
        } else {
            format!("{}/{}", base, path)
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, String)],
    ) -> Result<T, UpstreamError> {
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| UpstreamError::Request {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(UpstreamError::NotFound(url));
        }
        if !status.is_success() {
            return Err(UpstreamError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| UpstreamError::Decode {
                url,
                reason: e.to_string(),
            })
    }
}

#[async_trait::async_trait]
impl SourceApi for GitHubClient {
    async fn list_tags(
        &self,
        owner: &str,
        repo: &str,
        per_page: u32,
    ) -> Result<Vec<Tag>, UpstreamError> {
        self.get_json(
            self.repo_url(owner, repo, "tags"),
            &[("per_page", per_page.to_string())],
        )
        .await
    }

    async fn commit_detail(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<CommitDetail, UpstreamError> {
        self.get_json(self.repo_url(owner, repo, &format!("commits/{}", sha)), &[])
            .await
    }

    async fn tree(&self, owner: &str, repo: &str, sha: &str) -> Result<GitTree, UpstreamError> {
        self.get_json(
            self.repo_url(owner, repo, &format!("git/trees/{}", sha)),
            &[("recursive", "1".to_string())],
        )
        .await
    }

    async fn repository(&self, owner: &str, repo: &str) -> Result<Repository, UpstreamError> {
        self.get_json(self.repo_url(owner, repo, ""), &[]).await
    }

    async fn languages(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<BTreeMap<String, u64>, UpstreamError> {
        self.get_json(self.repo_url(owner, repo, "languages"), &[])
            .await
    }

    async fn contributors(
        &self,
        owner: &str,
        repo: &str,
        per_page: u32,
    ) -> Result<Vec<Contributor>, UpstreamError> {
        self.get_json(
            self.repo_url(owner, repo, "contributors"),
            &[("per_page", per_page.to_string())],
        )
        .await
    }

    async fn recent_commits(
        &self,
        owner: &str,
        repo: &str,
        per_page: u32,
    ) -> Result<Vec<CommitDetail>, UpstreamError> {
        self.get_json(
            self.repo_url(owner, repo, "commits"),
            &[("per_page", per_page.to_string())],
        )
        .await
    }

    async fn branches(
        &self,
        owner: &str,
        repo: &str,
        per_page: u32,
    ) -> Result<Vec<Branch>, UpstreamError> {
        self.get_json(
            self.repo_url(owner, repo, "branches"),
            &[("per_page", per_page.to_string())],
        )
        .await
    }

    async fn releases(
        &self,
        owner: &str,
        repo: &str,
        per_page: u32,
    ) -> Result<Vec<Release>, UpstreamError> {
        self.get_json(
            self.repo_url(owner, repo, "releases"),
            &[("per_page", per_page.to_string())],
        )
        .await
    }

    async fn search_repositories(
        &self,
        query: &str,
        per_page: u32,
    ) -> Result<SearchResults, UpstreamError> {
        self.get_json(
            format!("{}/search/repositories", self.base_url),
            &[
                ("q", query.to_string()),
                ("per_page", per_page.to_string()),
                ("sort", "stars".to_string()),
                ("order", "desc".to_string()),
            ],
        )
        .await
    }
}
