//! Wire types for the subset of the GitHub REST API git-wayback consumes
//!
//! Fields that GitHub may omit or null out are defaulted so a sparse
//! response still decodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub commit: TagCommit,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagCommit {
    pub sha: String,
}

/// `GET /repos/{owner}/{repo}/commits/{sha}` and list entries of `/commits`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitDetail {
    pub sha: String,
    pub commit: CommitPayload,
    /// Linked GitHub account, absent for unknown emails
    #[serde(default)]
    pub author: Option<UserRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitPayload {
    pub message: String,
    pub author: Signature,
    #[serde(default)]
    pub committer: Option<Signature>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRef {
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TreeItemKind {
    Blob,
    Tree,
    Commit,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreeItem {
    pub path: String,
    #[serde(default)]
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: TreeItemKind,
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// `GET /repos/{owner}/{repo}/git/trees/{sha}?recursive=1`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitTree {
    pub sha: String,
    pub tree: Vec<TreeItem>,
    #[serde(default)]
    pub truncated: bool,
}

impl GitTree {
    /// Blob entries only
    pub fn blobs(&self) -> impl Iterator<Item = &TreeItem> {
        self.tree
            .iter()
            .filter(|item| item.kind == TreeItemKind::Blob)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct License {
    pub name: String,
    #[serde(default)]
    pub spdx_id: Option<String>,
}

/// `GET /repos/{owner}/{repo}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub watchers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    #[serde(default)]
    pub size: u64,
    #[serde(default = "default_branch")]
    pub default_branch: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub license: Option<License>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub disabled: bool,
}

fn default_branch() -> String {
    "main".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contributor {
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
    pub contributions: u64,
    #[serde(default)]
    pub html_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Branch {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub prerelease: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchOwner {
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchRepository {
    pub id: u64,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    pub owner: SearchOwner,
}

/// `GET /search/repositories`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SearchResults {
    pub total_count: u64,
    #[serde(default)]
    pub items: Vec<SearchRepository>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_tree_with_unknown_kinds() {
        let json = r#"{
            "sha": "abc",
            "truncated": false,
            "tree": [
                {"path": "src", "mode": "040000", "type": "tree", "sha": "t1"},
                {"path": "src/lib.rs", "mode": "100644", "type": "blob", "sha": "b1", "size": 12},
                {"path": "vendor/dep", "mode": "160000", "type": "commit", "sha": "c1"},
                {"path": "odd", "type": "symlink-ish"}
            ]
        }"#;

        let tree: GitTree = serde_json::from_str(json).unwrap();
        assert_eq!(tree.tree.len(), 4);
        assert_eq!(tree.tree[3].kind, TreeItemKind::Other);

        let blobs: Vec<_> = tree.blobs().collect();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].size, Some(12));
    }

    #[test]
    fn test_decode_commit_detail_without_linked_author() {
        let json = r#"{
            "sha": "abc",
            "commit": {
                "message": "Initial commit\n\nbody",
                "author": {"name": "Mona", "email": "mona@example.com", "date": "2020-01-02T03:04:05Z"}
            },
            "author": null
        }"#;

        let detail: CommitDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.commit.author.name, "Mona");
        assert!(detail.author.is_none());
        assert!(detail.commit.committer.is_none());
    }

    #[test]
    fn test_decode_sparse_repository() {
        let json = r#"{
            "id": 1,
            "name": "hello",
            "full_name": "octocat/hello",
            "html_url": "https://github.com/octocat/hello",
            "description": null,
            "license": null
        }"#;

        let repo: Repository = serde_json::from_str(json).unwrap();
        assert_eq!(repo.default_branch, "main");
        assert!(repo.topics.is_empty());
        assert!(!repo.archived);
    }
}
