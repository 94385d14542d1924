//! HTTP API
//!
//! All routes live under `/api` and answer JSON. Every request passes the
//! per-client rate limiter before reaching its handler.

/// Error to response mapping
pub mod error;
/// Route handlers
pub mod handlers;
/// Request middleware
pub mod middleware;

pub use error::{ApiError, ErrorBody};

use crate::analysis::{AnalysisService, AnalysisTracker};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::Result;
use crate::evolution::{
    EvolutionService, JsonFileSnapshotStore, MemorySnapshotStore, SnapshotFetcher, SnapshotStore,
};
use crate::git::{GitCloneProvider, RepoProvider};
use crate::github::{GitHubClient, SourceApi};
use crate::insights::InsightService;
use crate::rate_limit::{RateLimitPolicy, RateLimiter};
use axum::routing::{get, post};
use axum::{Router, middleware as axum_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Backends the services are built on
pub struct Backends {
    pub source: Arc<dyn SourceApi>,
    pub store: Arc<dyn SnapshotStore>,
    pub repos: Arc<dyn RepoProvider>,
    pub clock: Arc<dyn Clock>,
}

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub evolution: EvolutionService,
    pub insights: InsightService,
    pub analysis: AnalysisService,
    pub rate_limiter: Arc<RateLimiter>,
    pub rate_limits: RateLimitPolicy,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wire the services over explicit backends
    pub fn new(config: Config, backends: Backends) -> Self {
        let Backends {
            source,
            store,
            repos,
            clock,
        } = backends;

        let evolution = EvolutionService::new(
            SnapshotFetcher::new(source.clone(), config.github.batch_size),
            store,
            clock.clone(),
            config.evolution.cache_ttl(),
        );
        let analysis = AnalysisService::new(
            Arc::new(AnalysisTracker::new(clock.clone())),
            repos,
            config.analysis.max_commits,
        );

        Self {
            rate_limits: RateLimitPolicy::from_settings(&config.rate_limit),
            rate_limiter: Arc::new(RateLimiter::new(clock.clone())),
            insights: InsightService::new(source),
            evolution,
            analysis,
            clock,
            config,
        }
    }

    /// Build production backends from configuration
    ///
    /// Without a configured store path the evolution cache lives in memory
    /// and the health check reports degraded.
    pub fn from_config(config: Config) -> Result<Self> {
        let client = GitHubClient::new(&config.github)?;
        if !client.is_authenticated() {
            tracing::warn!("No GitHub token configured; unauthenticated API limits apply");
        }

        let store: Arc<dyn SnapshotStore> = match config.store_path() {
            Ok(path) => {
                tracing::info!("Using snapshot store at {}", path.display());
                Arc::new(JsonFileSnapshotStore::open(path)?)
            }
            Err(e) => {
                tracing::warn!("{}; snapshots will not survive a restart", e);
                Arc::new(MemorySnapshotStore::new())
            }
        };

        let backends = Backends {
            source: Arc::new(client),
            store,
            repos: Arc::new(GitCloneProvider::new(config.analysis.repos_dir.clone())),
            clock: Arc::new(SystemClock),
        };
        Ok(Self::new(config, backends))
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/search", get(handlers::search))
        .route("/api/repos/:owner/:repo", get(handlers::overview))
        .route("/api/repos/:owner/:repo/evolution", get(handlers::evolution))
        .route("/api/repos/:owner/:repo/timeline", get(handlers::timeline))
        .route("/api/repos/:owner/:repo/tree", get(handlers::tree))
        .route("/api/analysis/start", post(handlers::start_analysis))
        .route("/api/analysis/status", get(handlers::analysis_status))
        .fallback(handlers::not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API on `bind` until `shutdown` resolves
pub async fn run_server(
    state: Arc<AppState>,
    bind: &str,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("git-wayback API listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    Ok(())
}
