use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A file in a snapshot's tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Slash-separated path, unique within the tree
    pub path: String,
    /// Final path segment
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Text after the last `.` of `name`, if any
    pub extension: Option<String>,
}

impl FileEntry {
    /// Build an entry from a tree path, deriving `name` and `extension`
    pub fn from_path(path: impl Into<String>, size: Option<u64>) -> Self {
        let path = path.into();
        let name = file_name(&path).to_string();
        let extension = file_extension(&name).map(str::to_string);
        Self {
            path,
            name,
            size: size.unwrap_or(0),
            extension,
        }
    }
}

/// Final segment of a slash-separated path
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Extension of a file name: the non-empty text after its last `.`
pub fn file_extension(name: &str) -> Option<&str> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

/// First line of a commit message
pub fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or("")
}

/// Aggregate stats derived from a snapshot's files
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotStats {
    pub total_files: usize,
    pub total_size: u64,
}

impl SnapshotStats {
    pub fn from_files(files: &[FileEntry]) -> Self {
        Self {
            total_files: files.len(),
            total_size: files.iter().map(|f| f.size).sum(),
        }
    }
}

/// The state of a repository at one tag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub tag: String,
    pub sha: String,
    /// Commit author date, used for ordering
    pub date: DateTime<Utc>,
    /// First line of the commit message
    pub message: String,
    pub files: Vec<FileEntry>,
    pub stats: SnapshotStats,
}

impl Snapshot {
    /// Build a snapshot, keeping only the first message line and deriving stats from `files`
    pub fn new(
        tag: impl Into<String>,
        sha: impl Into<String>,
        date: DateTime<Utc>,
        message: &str,
        files: Vec<FileEntry>,
    ) -> Self {
        let stats = SnapshotStats::from_files(&files);
        Self {
            tag: tag.into(),
            sha: sha.into(),
            date,
            message: first_line(message).to_string(),
            files,
            stats,
        }
    }
}

/// Cached evolution data for one repository, keyed by `owner/name`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionRecord {
    pub id: String,
    pub owner: String,
    pub name: String,
    /// Ascending by date
    pub snapshots: Vec<Snapshot>,
    pub tag_count: usize,
    /// When the snapshots were last fetched
    pub captured_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EvolutionRecord {
    pub fn new(owner: &str, name: &str, snapshots: Vec<Snapshot>, now: DateTime<Utc>) -> Self {
        Self {
            id: repo_key(owner, name),
            owner: owner.to_string(),
            name: name.to_string(),
            tag_count: snapshots.len(),
            snapshots,
            captured_at: now,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Key used for per-repository records: `owner/name`
pub fn repo_key(owner: &str, name: &str) -> String {
    format!("{}/{}", owner, name)
}

/// Outcome of an evolution lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvolutionResult {
    pub snapshots: Vec<Snapshot>,
    /// Whether the snapshots came from the store without a refetch
    pub cached: bool,
    pub captured_at: DateTime<Utc>,
}

/// Query string for the evolution endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvolutionQuery {
    /// Number of tags; invalid or missing values fall back to the default
    #[serde(default)]
    pub limit: Option<String>,
    /// `true` forces a refetch
    #[serde(default)]
    pub refresh: Option<String>,
}

impl EvolutionQuery {
    /// Resolve the requested limit into `[1, max]`, using `default` when absent or unparseable
    pub fn resolve_limit(&self, default: usize, max: usize) -> usize {
        resolve_limit(self.limit.as_deref(), default, max)
    }

    pub fn force_refresh(&self) -> bool {
        self.refresh.as_deref() == Some("true")
    }
}

/// Parse a `limit` query value, clamping it to `[1, max]`
pub fn resolve_limit(raw: Option<&str>, default: usize, max: usize) -> usize {
    let requested = raw
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v != 0)
        .map(|v| usize::try_from(v.max(1)).unwrap_or(1))
        .unwrap_or(default);
    requested.clamp(1, max.max(1))
}

/// Response body of the evolution endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionResponse {
    pub snapshots: Vec<Snapshot>,
    pub repo_name: String,
    pub cached: bool,
    pub captured_at: DateTime<Utc>,
}

/// Language share of a repository, in percent with one decimal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LanguageShare {
    pub name: String,
    pub bytes: u64,
    pub percentage: f64,
}

/// Commit counts bucketed by time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommitActivity {
    /// Sunday first
    pub by_day_of_week: [u32; 7],
    pub by_hour: [u32; 24],
    /// Keyed by `YYYY-MM`
    pub by_month: BTreeMap<String, u32>,
}

impl Default for CommitActivity {
    fn default() -> Self {
        Self {
            by_day_of_week: [0; 7],
            by_hour: [0; 24],
            by_month: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContributorSummary {
    pub login: String,
    pub avatar_url: String,
    pub contributions: u64,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecentCommit {
    pub sha: String,
    pub short_sha: String,
    pub message: String,
    pub author_name: String,
    pub author_login: Option<String>,
    pub author_avatar: Option<String>,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSummary {
    pub tag: String,
    pub name: String,
    pub published_at: Option<DateTime<Utc>>,
    pub url: String,
    pub prerelease: bool,
}

/// Aggregated repository overview
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryOverview {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub url: String,
    pub homepage: Option<String>,

    pub stars: u64,
    pub watchers: u64,
    pub forks: u64,
    pub open_issues: u64,
    /// In KB, as reported by GitHub
    pub size: u64,

    pub default_branch: String,
    pub license: Option<String>,
    pub topics: Vec<String>,
    pub visibility: Option<String>,
    pub archived: bool,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub pushed_at: Option<DateTime<Utc>>,

    pub languages: Vec<LanguageShare>,
    pub contributors: Vec<ContributorSummary>,
    pub recent_commits: Vec<RecentCommit>,
    pub branches: Vec<String>,
    pub branch_count: usize,
    pub releases: Vec<ReleaseSummary>,
    pub commit_activity: CommitActivity,
}

/// One tag on the timeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TagPoint {
    pub tag: String,
    pub sha: String,
    pub short_sha: String,
    pub message: String,
    pub date: DateTime<Utc>,
    pub index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineResponse {
    pub tags: Vec<TagPoint>,
    pub total_tags: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileNodeKind {
    File,
    Folder,
}

/// A file positioned in the tree visualization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FileNodeKind,
    pub size: u64,
    pub extension: Option<String>,
    pub depth: usize,
    pub parent_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TreeStats {
    pub total_files: usize,
    pub total_size: u64,
    pub extension_counts: BTreeMap<String, usize>,
    pub folder_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeResponse {
    pub sha: String,
    pub truncated: bool,
    pub files: Vec<FileNode>,
    pub folder_groups: BTreeMap<String, Vec<FileNode>>,
    pub stats: TreeStats,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchOwner {
    pub login: String,
    pub avatar: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    pub id: u64,
    pub full_name: String,
    pub description: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub owner: SearchOwner,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchResponse {
    pub total_count: u64,
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthChecks {
    pub config: bool,
    pub store: bool,
    pub github_token: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub checks: HealthChecks,
}
