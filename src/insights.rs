//! Read-through repository views
//!
//! Overview, tag timeline, file tree and search results are derived from the
//! source API on every request and are not cached.

use crate::error::{Result, UpstreamError};
use crate::github::{
    Branch, CommitDetail, Contributor, GitTree, Release, Repository, SearchResults, SourceApi,
    Tag, per_page,
};
use crate::types::{
    CommitActivity, ContributorSummary, FileEntry, FileNode, FileNodeKind, LanguageShare,
    RecentCommit, ReleaseSummary, RepositoryOverview, SearchItem, SearchOwner, SearchResponse,
    TagPoint, TimelineResponse, TreeResponse, TreeStats, first_line,
};
use crate::validation::{RepoParams, normalize_search_term};
use chrono::{DateTime, Datelike, Timelike, Utc};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Recent commits shown in the overview
pub const RECENT_COMMITS_SHOWN: usize = 15;

/// Timeline tag limit when the request does not specify one
pub const TIMELINE_DEFAULT_LIMIT: usize = 50;

/// Upper bound on timeline tags
pub const TIMELINE_MAX_LIMIT: usize = 100;

/// Group key for files at the repository root
pub const ROOT_GROUP: &str = "(root)";

/// Extension bucket for files without an extension
pub const NO_EXTENSION: &str = "(no ext)";

const SHORT_SHA_LEN: usize = 7;

fn short_sha(sha: &str) -> String {
    sha.chars().take(SHORT_SHA_LEN).collect()
}

/// Degrade a secondary lookup to an empty value
fn or_empty<T: Default>(what: &str, result: std::result::Result<T, UpstreamError>) -> T {
    result.unwrap_or_else(|e| {
        warn!("Failed to fetch {}: {}", what, e);
        T::default()
    })
}

/// Builds repository views from the source API
#[derive(Clone)]
pub struct InsightService {
    api: Arc<dyn SourceApi>,
}

impl InsightService {
    pub fn new(api: Arc<dyn SourceApi>) -> Self {
        Self { api }
    }

    /// Repository overview
    ///
    /// Repository metadata is required; languages, contributors, commits,
    /// branches and releases fall back to empty when their calls fail.
    pub async fn overview(&self, params: &RepoParams) -> Result<RepositoryOverview> {
        let (owner, repo) = (params.owner.as_str(), params.repo.as_str());

        let (repository, languages, contributors, commits, branches, releases) = tokio::join!(
            self.api.repository(owner, repo),
            self.api.languages(owner, repo),
            self.api.contributors(owner, repo, per_page::CONTRIBUTORS),
            self.api.recent_commits(owner, repo, per_page::COMMITS),
            self.api.branches(owner, repo, per_page::BRANCHES),
            self.api.releases(owner, repo, per_page::RELEASES),
        );

        let repository = repository?;
        Ok(build_overview(
            repository,
            &or_empty("languages", languages),
            or_empty("contributors", contributors),
            &or_empty("commits", commits),
            or_empty("branches", branches),
            or_empty("releases", releases),
        ))
    }

    /// Tags with their commit dates, oldest first
    ///
    /// Tags whose commit cannot be fetched are left out.
    pub async fn timeline(&self, params: &RepoParams, limit: usize) -> Result<TimelineResponse> {
        let (owner, repo) = (params.owner.as_str(), params.repo.as_str());
        let per_page = u32::try_from(limit).unwrap_or(u32::MAX);

        let mut tags = self.api.list_tags(owner, repo, per_page).await?;
        tags.truncate(limit);
        if tags.is_empty() {
            return Ok(TimelineResponse {
                tags: Vec::new(),
                total_tags: 0,
            });
        }

        let details = join_all(
            tags.iter()
                .map(|tag| self.api.commit_detail(owner, repo, &tag.commit.sha)),
        )
        .await;

        let points = tags
            .into_iter()
            .zip(details)
            .filter_map(|(tag, detail)| match detail {
                Ok(detail) => Some(tag_point(tag, &detail)),
                Err(e) => {
                    debug!("Dropping tag {} from timeline: {}", tag.name, e);
                    None
                }
            })
            .collect();

        Ok(build_timeline(points))
    }

    /// File tree of a commit
    pub async fn tree(&self, params: &RepoParams, sha: &str) -> Result<TreeResponse> {
        let tree = self.api.tree(&params.owner, &params.repo, sha).await?;
        Ok(build_tree(sha, &tree))
    }

    /// Repository search; short or missing terms yield an empty result
    pub async fn search(&self, query: Option<&str>) -> Result<SearchResponse> {
        let Some(term) = normalize_search_term(query) else {
            return Ok(SearchResponse::default());
        };

        let results = self
            .api
            .search_repositories(&term, per_page::SEARCH)
            .await?;
        Ok(build_search(results))
    }
}

/// Language shares in percent with one decimal, largest first
pub fn language_shares(languages: &BTreeMap<String, u64>) -> Vec<LanguageShare> {
    let total: u64 = languages.values().sum();
    let mut shares: Vec<LanguageShare> = languages
        .iter()
        .map(|(name, &bytes)| LanguageShare {
            name: name.clone(),
            bytes,
            percentage: if total > 0 {
                (bytes as f64 / total as f64 * 1000.0).round() / 10.0
            } else {
                0.0
            },
        })
        .collect();

    shares.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
    shares
}

/// Commit counts by weekday, hour and month of the author date (UTC)
pub fn commit_activity<'a>(dates: impl IntoIterator<Item = &'a DateTime<Utc>>) -> CommitActivity {
    let mut activity = CommitActivity::default();
    for date in dates {
        activity.by_day_of_week[date.weekday().num_days_from_sunday() as usize] += 1;
        activity.by_hour[date.hour() as usize] += 1;
        *activity
            .by_month
            .entry(date.format("%Y-%m").to_string())
            .or_insert(0) += 1;
    }
    activity
}

fn build_overview(
    repository: Repository,
    languages: &BTreeMap<String, u64>,
    contributors: Vec<Contributor>,
    commits: &[CommitDetail],
    branches: Vec<Branch>,
    releases: Vec<Release>,
) -> RepositoryOverview {
    let activity = commit_activity(commits.iter().map(|c| &c.commit.author.date));

    let recent_commits = commits
        .iter()
        .take(RECENT_COMMITS_SHOWN)
        .map(|c| RecentCommit {
            sha: c.sha.clone(),
            short_sha: short_sha(&c.sha),
            message: first_line(&c.commit.message).to_string(),
            author_name: c.commit.author.name.clone(),
            author_login: c.author.as_ref().map(|a| a.login.clone()),
            author_avatar: c.author.as_ref().map(|a| a.avatar_url.clone()),
            date: c.commit.author.date,
        })
        .collect();

    let contributors = contributors
        .into_iter()
        .map(|c| ContributorSummary {
            login: c.login,
            avatar_url: c.avatar_url,
            contributions: c.contributions,
            url: c.html_url,
        })
        .collect();

    let releases = releases
        .into_iter()
        .map(|r| ReleaseSummary {
            name: r
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| r.tag_name.clone()),
            tag: r.tag_name,
            published_at: r.published_at,
            url: r.html_url,
            prerelease: r.prerelease,
        })
        .collect();

    let branch_names: Vec<String> = branches.into_iter().map(|b| b.name).collect();

    RepositoryOverview {
        id: repository.id,
        name: repository.name,
        full_name: repository.full_name,
        description: repository.description,
        url: repository.html_url,
        homepage: repository.homepage,
        stars: repository.stargazers_count,
        watchers: repository.watchers_count,
        forks: repository.forks_count,
        open_issues: repository.open_issues_count,
        size: repository.size,
        default_branch: repository.default_branch,
        license: repository.license.map(|l| l.name),
        topics: repository.topics,
        visibility: repository.visibility,
        archived: repository.archived,
        created_at: repository.created_at,
        updated_at: repository.updated_at,
        pushed_at: repository.pushed_at,
        languages: language_shares(languages),
        contributors,
        recent_commits,
        branch_count: branch_names.len(),
        branches: branch_names,
        releases,
        commit_activity: activity,
    }
}

fn tag_point(tag: Tag, detail: &CommitDetail) -> TagPoint {
    TagPoint {
        short_sha: short_sha(&tag.commit.sha),
        tag: tag.name,
        sha: tag.commit.sha,
        message: first_line(&detail.commit.message).to_string(),
        date: detail.commit.author.date,
        index: 0,
    }
}

/// Sort points by date and number them from 0
fn build_timeline(mut points: Vec<TagPoint>) -> TimelineResponse {
    points.sort_by_key(|p| p.date);
    for (index, point) in points.iter_mut().enumerate() {
        point.index = index;
    }
    TimelineResponse {
        total_tags: points.len(),
        tags: points,
    }
}

/// Blob nodes of `tree` grouped by top-level folder, with per-extension and per-folder counts
pub fn build_tree(sha: &str, tree: &GitTree) -> TreeResponse {
    let files: Vec<FileNode> = tree
        .blobs()
        .map(|item| {
            let entry = FileEntry::from_path(item.path.clone(), item.size);
            let parent_path = item.path.rsplit_once('/').map(|(parent, _)| parent.to_string());
            FileNode {
                depth: item.path.matches('/').count(),
                parent_path,
                kind: FileNodeKind::File,
                path: entry.path,
                name: entry.name,
                size: entry.size,
                extension: entry.extension,
            }
        })
        .collect();

    let mut folder_groups: BTreeMap<String, Vec<FileNode>> = BTreeMap::new();
    let mut stats = TreeStats {
        total_files: files.len(),
        total_size: files.iter().map(|f| f.size).sum(),
        ..TreeStats::default()
    };

    for file in &files {
        let group = match file.path.split_once('/') {
            Some((top, _)) => top,
            None => ROOT_GROUP,
        };
        folder_groups
            .entry(group.to_string())
            .or_default()
            .push(file.clone());

        let extension = file.extension.as_deref().unwrap_or(NO_EXTENSION);
        *stats
            .extension_counts
            .entry(extension.to_string())
            .or_insert(0) += 1;
    }

    stats.folder_counts = folder_groups
        .iter()
        .map(|(folder, files)| (folder.clone(), files.len()))
        .collect();

    TreeResponse {
        sha: sha.to_string(),
        truncated: tree.truncated,
        files,
        folder_groups,
        stats,
    }
}

fn build_search(results: SearchResults) -> SearchResponse {
    SearchResponse {
        total_count: results.total_count,
        items: results
            .items
            .into_iter()
            .map(|item| SearchItem {
                id: item.id,
                full_name: item.full_name,
                description: item.description,
                stars: item.stargazers_count,
                forks: item.forks_count,
                owner: SearchOwner {
                    login: item.owner.login,
                    avatar: item.owner.avatar_url,
                },
            })
            .collect(),
    }
}
