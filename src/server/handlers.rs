use super::AppState;
use super::error::{ApiError, ErrorBody};
use crate::analysis::{AnalysisStartResponse, AnalysisStatusResponse};
use crate::insights::{TIMELINE_DEFAULT_LIMIT, TIMELINE_MAX_LIMIT};
use crate::types::{
    EvolutionQuery, EvolutionResponse, HealthChecks, HealthResponse, HealthStatus,
    RepositoryOverview, SearchResponse, TimelineResponse, TreeResponse, resolve_limit,
};
use crate::validation::{
    RepoParams, require_repo_params, validate_commit_sha, validate_repo_params,
};
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri};
use serde::Deserialize;
use std::sync::Arc;

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TimelineQuery {
    #[serde(default)]
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TreeQuery {
    #[serde(default)]
    pub sha: Option<String>,
}

/// Owner and repository given as query parameters or a JSON body
#[derive(Debug, Default, Deserialize)]
pub struct RepoRef {
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
}

impl RepoRef {
    fn validate(&self) -> Result<RepoParams, ApiError> {
        Ok(require_repo_params(
            self.owner.as_deref(),
            self.repo.as_deref(),
        )?)
    }
}

fn repo_from_path((owner, repo): (String, String)) -> Result<RepoParams, ApiError> {
    Ok(validate_repo_params(&owner, &repo)?)
}

/// Service health; always answers 200
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let missing = state.config.missing_required();
    for issue in &missing {
        tracing::debug!("Health check: {}", issue);
    }

    let checks = HealthChecks {
        config: missing.is_empty(),
        store: state.evolution.store().is_persistent(),
        github_token: state.config.github.token.is_some(),
    };
    let status = if checks.config && checks.store {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };

    Json(HealthResponse {
        status,
        timestamp: state.clock.now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks,
    })
}

/// Repository search by name
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<SearchResponse> {
    Ok(Json(state.insights.search(query.q.as_deref()).await?))
}

/// Repository overview
pub async fn overview(
    State(state): State<Arc<AppState>>,
    Path(path): Path<(String, String)>,
) -> ApiResult<RepositoryOverview> {
    let params = repo_from_path(path)?;
    Ok(Json(state.insights.overview(&params).await?))
}

/// Per-tag snapshots, cached for the configured TTL
pub async fn evolution(
    State(state): State<Arc<AppState>>,
    Path(path): Path<(String, String)>,
    Query(query): Query<EvolutionQuery>,
) -> ApiResult<EvolutionResponse> {
    let params = repo_from_path(path)?;
    let limit = query.resolve_limit(
        state.config.evolution.default_limit,
        state.config.evolution.max_limit,
    );

    let result = state
        .evolution
        .get_evolution(&params.owner, &params.repo, limit, query.force_refresh())
        .await?;

    Ok(Json(EvolutionResponse {
        snapshots: result.snapshots,
        repo_name: params.repo,
        cached: result.cached,
        captured_at: result.captured_at,
    }))
}

/// Tag timeline
pub async fn timeline(
    State(state): State<Arc<AppState>>,
    Path(path): Path<(String, String)>,
    Query(query): Query<TimelineQuery>,
) -> ApiResult<TimelineResponse> {
    let params = repo_from_path(path)?;
    let limit = resolve_limit(
        query.limit.as_deref(),
        TIMELINE_DEFAULT_LIMIT,
        TIMELINE_MAX_LIMIT,
    );
    Ok(Json(state.insights.timeline(&params, limit).await?))
}

/// File tree at a commit
pub async fn tree(
    State(state): State<Arc<AppState>>,
    Path(path): Path<(String, String)>,
    Query(query): Query<TreeQuery>,
) -> ApiResult<TreeResponse> {
    let params = repo_from_path(path)?;
    let sha = validate_commit_sha(query.sha.as_deref())?;
    Ok(Json(state.insights.tree(&params, &sha).await?))
}

/// Start a local clone analysis
///
/// An unreadable body is treated like one without owner and repo.
pub async fn start_analysis(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<AnalysisStartResponse> {
    let request: RepoRef = serde_json::from_slice(&body).unwrap_or_else(|e| {
        tracing::debug!("Ignoring unreadable analysis request body: {}", e);
        RepoRef::default()
    });
    let params = request.validate()?;
    Ok(Json(state.analysis.start(&params).await))
}

/// Progress of a local clone analysis
pub async fn analysis_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RepoRef>,
) -> ApiResult<AnalysisStatusResponse> {
    let params = query.validate()?;
    Ok(Json(state.analysis.status(&params).await))
}

/// Unknown routes
pub async fn not_found(uri: Uri) -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "not_found".to_string(),
            message: format!("No route for {}", uri.path()),
        }),
    )
}
