/// Configuration system for git-wayback
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::error::{ConfigError, WaybackError};
use crate::rate_limit::RateLimitConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Evolution snapshots older than this are refetched (24 hours)
pub const EVOLUTION_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Tags enriched concurrently per batch against the GitHub API
pub const GITHUB_BATCH_SIZE: usize = 5;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// GitHub API client configuration
    #[serde(default)]
    pub github: GitHubConfig,

    /// Evolution snapshot configuration
    #[serde(default)]
    pub evolution: EvolutionConfig,

    /// Per-endpoint-class request quotas
    #[serde(default)]
    pub rate_limit: RateLimitSettings,

    /// Snapshot store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Local clone analysis configuration
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "default_bind")]
    pub bind: String,
}

/// GitHub API client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// REST API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Bearer token; unauthenticated rate limits apply when absent
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// Value of the User-Agent header
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Tags enriched concurrently per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Evolution snapshot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Maximum age of a cached record before it is refetched
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Tags fetched when the request does not specify a limit
    #[serde(default = "default_evolution_limit")]
    pub default_limit: usize,

    /// Upper bound on requested tags
    #[serde(default = "default_evolution_max_limit")]
    pub max_limit: usize,
}

/// Quota for one endpoint class
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuotaSettings {
    /// Requests allowed per window
    pub max_requests: u32,
    /// Window length in seconds
    pub window_secs: u64,
}

/// Per-endpoint-class request quotas
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Standard API endpoints
    #[serde(default = "default_api_quota")]
    pub api: QuotaSettings,

    /// Repository search (more expensive)
    #[serde(default = "default_search_quota")]
    pub search: QuotaSettings,

    /// Evolution data (GitHub API intensive)
    #[serde(default = "default_evolution_quota")]
    pub evolution: QuotaSettings,

    /// Health checks (lenient)
    #[serde(default = "default_health_quota")]
    pub health: QuotaSettings,

    /// Interval between sweeps of expired entries
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

/// Snapshot store configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// JSON file backing the evolution snapshot store.
    /// Required for persistence; an in-memory store is used when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Local clone analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Directory holding clones as `<owner>/<repo>`
    #[serde(default = "default_repos_dir")]
    pub repos_dir: PathBuf,

    /// Commits sampled from the first-parent history
    #[serde(default = "default_max_commits")]
    pub max_commits: usize,
}

// Default value functions
fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_user_agent() -> String {
    "git-wayback".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_batch_size() -> usize {
    GITHUB_BATCH_SIZE
}

fn default_cache_ttl_secs() -> u64 {
    EVOLUTION_CACHE_TTL_SECS
}

fn default_evolution_limit() -> usize {
    20
}

fn default_evolution_max_limit() -> usize {
    30
}

fn default_api_quota() -> QuotaSettings {
    QuotaSettings {
        max_requests: 100,
        window_secs: 60,
    }
}

fn default_search_quota() -> QuotaSettings {
    QuotaSettings {
        max_requests: 30,
        window_secs: 60,
    }
}

fn default_evolution_quota() -> QuotaSettings {
    QuotaSettings {
        max_requests: 20,
        window_secs: 60,
    }
}

fn default_health_quota() -> QuotaSettings {
    QuotaSettings {
        max_requests: 300,
        window_secs: 60,
    }
}

fn default_sweep_interval_secs() -> u64 {
    5 * 60
}

fn default_repos_dir() -> PathBuf {
    crate::paths::PlatformPaths::default_repos_dir()
}

fn default_max_commits() -> usize {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            token: None,
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            default_limit: default_evolution_limit(),
            max_limit: default_evolution_max_limit(),
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            api: default_api_quota(),
            search: default_search_quota(),
            evolution: default_evolution_quota(),
            health: default_health_quota(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            repos_dir: default_repos_dir(),
            max_commits: default_max_commits(),
        }
    }
}

impl QuotaSettings {
    /// Convert into the limiter's runtime configuration
    pub fn to_limit(self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.max_requests,
            window: Duration::from_secs(self.window_secs),
        }
    }
}

impl EvolutionConfig {
    /// Cache TTL as a chrono duration
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.cache_ttl_secs).unwrap_or(i64::MAX))
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, WaybackError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, WaybackError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), WaybackError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), WaybackError> {
        fn invalid(key: &str, reason: impl Into<String>) -> WaybackError {
            ConfigError::InvalidValue {
                key: key.to_string(),
                reason: reason.into(),
            }
            .into()
        }

        if self.github.batch_size == 0 {
            return Err(invalid("github.batch_size", "must be greater than 0"));
        }

        if self.evolution.cache_ttl_secs == 0 {
            return Err(invalid("evolution.cache_ttl_secs", "must be greater than 0"));
        }

        if self.evolution.max_limit == 0 {
            return Err(invalid("evolution.max_limit", "must be greater than 0"));
        }

        if !(1..=self.evolution.max_limit).contains(&self.evolution.default_limit) {
            return Err(invalid(
                "evolution.default_limit",
                format!(
                    "must be between 1 and {}, got {}",
                    self.evolution.max_limit, self.evolution.default_limit
                ),
            ));
        }

        let quotas = [
            ("rate_limit.api", self.rate_limit.api),
            ("rate_limit.search", self.rate_limit.search),
            ("rate_limit.evolution", self.rate_limit.evolution),
            ("rate_limit.health", self.rate_limit.health),
        ];
        for (key, quota) in quotas {
            if quota.max_requests == 0 || quota.window_secs == 0 {
                return Err(invalid(key, "max_requests and window_secs must be greater than 0"));
            }
        }

        if self.rate_limit.sweep_interval_secs == 0 {
            return Err(invalid(
                "rate_limit.sweep_interval_secs",
                "must be greater than 0",
            ));
        }

        if self.analysis.max_commits == 0 {
            return Err(invalid("analysis.max_commits", "must be greater than 0"));
        }

        Ok(())
    }

    /// Values that are required for full operation but missing
    ///
    /// Missing values degrade the service instead of stopping it.
    pub fn missing_required(&self) -> Vec<ConfigError> {
        let mut missing = Vec::new();
        if self.store.path.is_none() {
            missing.push(ConfigError::MissingRequired(
                "store.path (GIT_WAYBACK_STORE_PATH)".to_string(),
            ));
        }
        missing
    }

    /// The persistent store path, failing when it is not configured
    pub fn store_path(&self) -> Result<&Path, ConfigError> {
        self.store.path.as_deref().ok_or_else(|| {
            ConfigError::MissingRequired("store.path (GIT_WAYBACK_STORE_PATH)".to_string())
        })
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable source. Blank values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(token) = get("GITHUB_TOKEN") {
            self.github.token = Some(token);
        }

        if let Some(url) = get("GIT_WAYBACK_GITHUB_API_URL") {
            self.github.api_base_url = url;
        }

        if let Some(bind) = get("GIT_WAYBACK_BIND") {
            self.server.bind = bind;
        }

        if let Some(path) = get("GIT_WAYBACK_STORE_PATH") {
            self.store.path = Some(PathBuf::from(path));
        }

        if let Some(dir) = get("GIT_WAYBACK_REPOS_DIR") {
            self.analysis.repos_dir = PathBuf::from(dir);
        }

        if let Some(ttl) = get("GIT_WAYBACK_CACHE_TTL_SECS")
            && let Ok(secs) = ttl.parse()
        {
            self.evolution.cache_ttl_secs = secs;
        }
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, WaybackError> {
        let mut config = Self::load_or_default()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}
