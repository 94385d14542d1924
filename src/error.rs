/// Centralized error types for git-wayback using thiserror
///
/// Provides domain-specific error types for better error handling and user-facing messages.
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Main error type for git-wayback
#[derive(Error, Debug)]
pub enum WaybackError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("{0}")]
    RateLimited(#[from] RateLimitError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors related to input validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error(
        "Invalid GitHub owner: \"{0}\". Must be 1-39 alphanumeric characters or single hyphens."
    )]
    InvalidOwner(String),

    #[error("Invalid repository name: \"{0}\". Must be 1-100 valid characters.")]
    InvalidRepo(String),

    #[error("Invalid commit SHA: \"{0}\". Must be 7-40 hexadecimal characters.")]
    InvalidCommitSha(String),

    #[error("{0} is required")]
    MissingParameter(String),
}

/// Errors raised while talking to the source repository API
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unexpected response shape from {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// Raised by the rate limiter when a window's quota is exhausted
#[derive(Error, Debug, Clone)]
#[error("Rate limit exceeded. Please try again in {retry_after_secs} seconds.")]
pub struct RateLimitError {
    /// Quota for the window that was exhausted
    pub limit: u32,
    /// When the current window ends
    pub reset_at: DateTime<Utc>,
    /// Seconds until the window resets, rounded up
    pub retry_after_secs: u64,
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Failures of a background repository analysis
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to clone {repo}: {reason}")]
    CloneFailed { repo: String, reason: String },

    #[error("No commits found in repository")]
    EmptyHistory,

    #[error("Analysis task aborted: {0}")]
    Aborted(String),

    #[error(transparent)]
    Git(#[from] GitError),
}

/// Errors related to the snapshot store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to load store from '{path}': {reason}")]
    LoadFailed { path: String, reason: String },

    #[error("Failed to save store to '{path}': {reason}")]
    SaveFailed { path: String, reason: String },
}

/// Errors related to git operations
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Git repository not found at: {0}")]
    RepoNotFound(String),

    #[error("Failed to open git repository: {0}")]
    OpenFailed(String),

    #[error("Failed to iterate commits: {0}")]
    IterFailed(String),

    #[error("Failed to parse commit: {0}")]
    ParseFailed(String),
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::IterFailed(err.message().to_string())
    }
}

// Conversion from anyhow::Error to WaybackError
impl From<anyhow::Error> for WaybackError {
    fn from(err: anyhow::Error) -> Self {
        WaybackError::Other(format!("{:#}", err))
    }
}

/// Result alias used across the crate
pub type Result<T, E = WaybackError> = std::result::Result<T, E>;

// Helper methods for WaybackError
impl WaybackError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        WaybackError::Other(msg.into())
    }

    /// Short machine-readable kind used in API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            WaybackError::Validation(_) => "validation_error",
            WaybackError::Upstream(UpstreamError::NotFound(_)) => "not_found",
            WaybackError::Upstream(_) => "upstream_error",
            WaybackError::RateLimited(_) => "rate_limited",
            WaybackError::Config(_) => "config_error",
            WaybackError::Analysis(_) => "analysis_failed",
            WaybackError::Store(_) => "store_error",
            WaybackError::Git(_) => "git_error",
            WaybackError::Io(_) | WaybackError::Other(_) => "internal_error",
        }
    }

    /// Check if this is a user error (validation, quota, unknown repository) vs system error
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            WaybackError::Validation(_)
                | WaybackError::RateLimited(_)
                | WaybackError::Upstream(UpstreamError::NotFound(_))
        )
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WaybackError::Upstream(UpstreamError::Request { .. })
                | WaybackError::Upstream(UpstreamError::Status { status: 500..=599, .. })
                | WaybackError::Io(_)
        )
    }
}
