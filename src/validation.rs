//! Input validation for GitHub owner/repository names, commit SHAs and search terms

use crate::error::ValidationError;
use regex::Regex;
use std::sync::LazyLock;

/// Longest accepted search term; longer terms are truncated
pub const MAX_SEARCH_LENGTH: usize = 256;

/// Shortest meaningful search term
pub const MIN_SEARCH_LENGTH: usize = 2;

/// 1-39 characters, alphanumeric or hyphens, no leading or trailing hyphen
static OWNER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,37}[A-Za-z0-9])?$").expect("owner pattern is valid")
});

/// 1-100 characters from the allowed set. The leading-dot rule is checked separately.
static REPO_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]{1,100}$").expect("repo pattern is valid"));

static SHA_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Fa-f0-9]{7,40}$").expect("sha pattern is valid"));

/// Validated `owner/repo` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoParams {
    pub owner: String,
    pub repo: String,
}

impl RepoParams {
    /// `owner/repo`
    pub fn key(&self) -> String {
        crate::types::repo_key(&self.owner, &self.repo)
    }
}

/// Whether `owner` is a valid GitHub user or organization name
///
/// Consecutive hyphens are rejected as GitHub does.
pub fn is_valid_owner(owner: &str) -> bool {
    OWNER_PATTERN.is_match(owner) && !owner.contains("--")
}

/// Whether `repo` is a valid GitHub repository name
pub fn is_valid_repo(repo: &str) -> bool {
    if repo == "." || repo == ".." || repo.starts_with('.') {
        return false;
    }
    REPO_PATTERN.is_match(repo)
}

/// Whether `sha` looks like a full or abbreviated commit SHA
pub fn is_valid_commit_sha(sha: &str) -> bool {
    SHA_PATTERN.is_match(sha)
}

/// Validate an owner/repo pair from route or body parameters
pub fn validate_repo_params(owner: &str, repo: &str) -> Result<RepoParams, ValidationError> {
    if !is_valid_owner(owner) {
        return Err(ValidationError::InvalidOwner(owner.to_string()));
    }
    if !is_valid_repo(repo) {
        return Err(ValidationError::InvalidRepo(repo.to_string()));
    }
    Ok(RepoParams {
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}

/// Validate optional owner/repo parameters, reporting missing ones first
pub fn require_repo_params(
    owner: Option<&str>,
    repo: Option<&str>,
) -> Result<RepoParams, ValidationError> {
    match (owner.filter(|o| !o.is_empty()), repo.filter(|r| !r.is_empty())) {
        (Some(owner), Some(repo)) => validate_repo_params(owner, repo),
        _ => Err(ValidationError::MissingParameter(
            "owner and repo".to_string(),
        )),
    }
}

/// Validate a `sha` parameter
pub fn validate_commit_sha(sha: Option<&str>) -> Result<String, ValidationError> {
    let sha = sha
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ValidationError::MissingParameter("sha query parameter".to_string()))?;
    if !is_valid_commit_sha(sha) {
        return Err(ValidationError::InvalidCommitSha(sha.to_string()));
    }
    Ok(sha.to_string())
}

/// Lenient search normalization: `None` for short or missing terms,
/// otherwise the trimmed term cut to [`MAX_SEARCH_LENGTH`] characters
pub fn normalize_search_term(query: Option<&str>) -> Option<String> {
    let trimmed = query?.trim();
    if trimmed.chars().count() < MIN_SEARCH_LENGTH {
        return None;
    }
    Some(trimmed.chars().take(MAX_SEARCH_LENGTH).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_owners() {
        assert!(is_valid_owner("a"));
        assert!(is_valid_owner("a-b"));
        assert!(is_valid_owner("octocat"));
        assert!(is_valid_owner(&"a".repeat(39)));
    }

    #[test]
    fn test_invalid_owners() {
        assert!(!is_valid_owner(""));
        assert!(!is_valid_owner("-a"));
        assert!(!is_valid_owner("a-"));
        assert!(!is_valid_owner("a--b"));
        assert!(!is_valid_owner(&"a".repeat(40)));
        assert!(!is_valid_owner("a_b"));
        assert!(!is_valid_owner("a/b"));
    }

    #[test]
    fn test_valid_repos() {
        assert!(is_valid_repo("a.b_c-1"));
        assert!(is_valid_repo("hello-world"));
        assert!(is_valid_repo(&"r".repeat(100)));
    }

    #[test]
    fn test_invalid_repos() {
        assert!(!is_valid_repo(""));
        assert!(!is_valid_repo("."));
        assert!(!is_valid_repo(".."));
        assert!(!is_valid_repo(".hidden"));
        assert!(!is_valid_repo("a/b"));
        assert!(!is_valid_repo(&"r".repeat(101)));
    }

    #[test]
    fn test_validate_repo_params_reports_owner_first() {
        let err = validate_repo_params("-bad", "..").unwrap_err();
        assert_eq!(err, ValidationError::InvalidOwner("-bad".to_string()));

        let err = validate_repo_params("good", "..").unwrap_err();
        assert_eq!(err, ValidationError::InvalidRepo("..".to_string()));

        let params = validate_repo_params("octocat", "hello").unwrap();
        assert_eq!(params.key(), "octocat/hello");
    }

    #[test]
    fn test_require_repo_params_missing() {
        let err = require_repo_params(Some("octocat"), None).unwrap_err();
        assert!(matches!(err, ValidationError::MissingParameter(_)));

        let err = require_repo_params(Some(""), Some("hello")).unwrap_err();
        assert!(matches!(err, ValidationError::MissingParameter(_)));
    }

    #[test]
    fn test_commit_sha_validation() {
        assert!(is_valid_commit_sha("abc1234"));
        assert!(is_valid_commit_sha(&"f".repeat(40)));
        assert!(!is_valid_commit_sha("abc123"));
        assert!(!is_valid_commit_sha("xyz1234"));
        assert!(!is_valid_commit_sha(&"f".repeat(41)));

        assert!(matches!(
            validate_commit_sha(None),
            Err(ValidationError::MissingParameter(_))
        ));
        assert!(matches!(
            validate_commit_sha(Some("nothex!")),
            Err(ValidationError::InvalidCommitSha(_))
        ));
        assert_eq!(validate_commit_sha(Some("ABCDEF0")).unwrap(), "ABCDEF0");
    }

    #[test]
    fn test_normalize_search_term() {
        assert_eq!(normalize_search_term(None), None);
        assert_eq!(normalize_search_term(Some(" a ")), None);
        assert_eq!(normalize_search_term(Some(" tokio ")).as_deref(), Some("tokio"));

        let long = "y".repeat(300);
        assert_eq!(normalize_search_term(Some(&long)).unwrap().len(), 256);
    }
}
