//! Per-client fixed-window rate limiting
//!
//! Each `(path, client)` pair gets a counter that resets wholesale when its
//! window ends. Expired entries are replaced on the next request and removed
//! by a periodic sweep.

use crate::clock::Clock;
use crate::config::RateLimitSettings;
use crate::error::RateLimitError;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Identity used when the client address cannot be determined
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Quota for one endpoint class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Seconds until the window resets, rounded up
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.reset_at - now).num_milliseconds().max(0) as u64;
        millis.div_ceil(1000)
    }

    /// Window reset as epoch seconds, rounded up
    pub fn reset_epoch_secs(&self) -> i64 {
        let millis = self.reset_at.timestamp_millis();
        millis.div_euclid(1000) + i64::from(millis.rem_euclid(1000) != 0)
    }

    /// The rejection for a denied request
    pub fn to_error(&self, now: DateTime<Utc>) -> RateLimitError {
        RateLimitError {
            limit: self.limit,
            reset_at: self.reset_at,
            retry_after_secs: self.retry_after_secs(now),
        }
    }
}

/// Endpoint classes with separate quotas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointClass {
    Health,
    Search,
    Evolution,
    Api,
}

impl EndpointClass {
    /// Class of a request path, or `None` for paths outside `/api/`
    pub fn classify(path: &str) -> Option<Self> {
        if !path.starts_with("/api/") {
            return None;
        }
        Some(match path {
            "/api/health" => EndpointClass::Health,
            "/api/search" => EndpointClass::Search,
            p if p.contains("/evolution") => EndpointClass::Evolution,
            _ => EndpointClass::Api,
        })
    }
}

/// Quotas for every endpoint class
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    pub api: RateLimitConfig,
    pub search: RateLimitConfig,
    pub evolution: RateLimitConfig,
    pub health: RateLimitConfig,
}

impl RateLimitPolicy {
    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self {
            api: settings.api.to_limit(),
            search: settings.search.to_limit(),
            evolution: settings.evolution.to_limit(),
            health: settings.health.to_limit(),
        }
    }

    pub fn for_class(&self, class: EndpointClass) -> RateLimitConfig {
        match class {
            EndpointClass::Health => self.health,
            EndpointClass::Search => self.search,
            EndpointClass::Evolution => self.evolution,
            EndpointClass::Api => self.api,
        }
    }

    /// Quota for a request path, or `None` when the path is not limited
    pub fn for_path(&self, path: &str) -> Option<RateLimitConfig> {
        EndpointClass::classify(path).map(|class| self.for_class(class))
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::from_settings(&RateLimitSettings::default())
    }
}

#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// In-process rate limiter shared by all request handlers
pub struct RateLimiter {
    entries: Mutex<HashMap<(String, String), RateLimitEntry>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Count a request from `client` to `path` and decide whether it is allowed
    pub fn check(&self, client: &str, path: &str, config: RateLimitConfig) -> RateLimitDecision {
        let now = self.clock.now();
        let window = chrono::Duration::from_std(config.window)
            .unwrap_or_else(|_| chrono::Duration::weeks(52));

        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        let entry = entries
            .entry((path.to_string(), client.to_string()))
            .or_insert(RateLimitEntry {
                count: 0,
                reset_at: now + window,
            });

        if entry.reset_at <= now {
            *entry = RateLimitEntry {
                count: 0,
                reset_at: now + window,
            };
        }
        entry.count = entry.count.saturating_add(1);

        RateLimitDecision {
            allowed: entry.count <= config.max_requests,
            limit: config.max_requests,
            remaining: config.max_requests.saturating_sub(entry.count),
            reset_at: entry.reset_at,
        }
    }

    /// Remove every entry whose window has ended, returning how many were removed
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| entry.reset_at > now);
        before - entries.len()
    }

    /// Number of tracked `(path, client)` pairs
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sweep expired entries every `interval` until `cancel` fires
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("Rate limit sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = self.sweep();
                        if removed > 0 {
                            tracing::debug!("Swept {} expired rate limit entries", removed);
                        }
                    }
                }
            }
        })
    }
}

/// Identity of the client behind a request
///
/// Prefers the first `x-forwarded-for` address, then `x-real-ip`, then the
/// connection address.
pub fn client_key(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(forwarded) = header("x-forwarded-for")
        && let Some(first) = forwarded.split(',').map(str::trim).find(|ip| !ip.is_empty())
    {
        return first.to_string();
    }

    if let Some(real_ip) = header("x-real-ip") {
        return real_ip.to_string();
    }

    remote
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
