//! # git-wayback - Repository History Visualization Backend
//!
//! An HTTP API that reconstructs how a GitHub repository looked at each of
//! its tags, and serves repository overviews, tag timelines and file trees
//! for visualization frontends.
//!
//! ## Overview
//!
//! Evolution snapshots are fetched from the GitHub REST API in small
//! concurrent batches and cached per repository for a configurable TTL.
//! Deeper commit history comes from a local clone that is analyzed in the
//! background while clients poll its progress.
//!
//! ## Key Features
//!
//! - **Evolution Snapshots**: Per-tag file lists with sizes, oldest first
//! - **Snapshot Cache**: TTL-bounded records in a JSON file store
//! - **Repository Views**: Overview, timeline, tree and search, read-through
//! - **Clone Analysis**: git2 first-parent walk with evenly spaced sampling
//! - **Rate Limiting**: Fixed-window quotas per client and endpoint class
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Visualizer UI  │
//! └────────┬────────┘
//!          │ HTTP/JSON
//! ┌────────▼────────┐
//! │   axum Router   │  (rate limit middleware)
//! └────────┬────────┘
//!          │
//!    ┌─────┴──────┬─────────────┬──────────────┐
//!    │            │             │              │
//! ┌──▼───────┐ ┌──▼───────┐ ┌───▼──────┐ ┌─────▼──────┐
//! │Evolution │ │Insights  │ │Analysis  │ │RateLimiter │
//! └──┬────┬──┘ └──┬───────┘ └───┬──────┘ └────────────┘
//!    │    │       │             │
//! ┌──▼──┐ ┌▼───────▼──┐    ┌────▼─────┐
//! │Store│ │GitHub API │    │git2 clone│
//! └─────┘ └───────────┘    └──────────┘
//! ```
//!
//! ## Modules
//!
//! - [`server`]: Router, handlers, middleware and error responses
//! - [`evolution`]: Snapshot fetching, caching and stores
//! - [`insights`]: Overview, timeline, tree and search views
//! - [`analysis`]: Background clone analysis and progress tracking
//! - [`github`]: GitHub REST API client behind the [`github::SourceApi`] trait
//! - [`git`]: Cloning, first-parent history walking and sampling
//! - [`rate_limit`]: Fixed-window per-client rate limiter
//! - [`config`]: Configuration management with environment variable support
//! - [`validation`]: Owner, repository, SHA and search term validation
//! - [`types`]: Domain records and API response bodies
//! - [`clock`]: Injectable time source
//! - [`error`]: Error types and result aliases
//! - [`paths`]: Platform data and config directories
//!
//! ## Usage Example
//!
//! ```no_run
//! use git_wayback::config::Config;
//! use git_wayback::server::{AppState, run_server};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::new()?;
//!     let bind = config.server.bind.clone();
//!     let state = Arc::new(AppState::from_config(config)?);
//!
//!     run_server(state, &bind, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! }
//! ```

/// Background clone analysis with pollable progress
pub mod analysis;

/// Injectable time source
pub mod clock;

/// Configuration management with environment variable overrides
pub mod config;

/// Error types and utilities
pub mod error;

/// Tag evolution snapshots with a TTL-bounded store
pub mod evolution;

/// Local clones, first-parent history and commit sampling
pub mod git;

/// GitHub REST API client
pub mod github;

/// Read-through repository views
pub mod insights;

/// Platform data and config directories
pub mod paths;

/// Per-client fixed-window rate limiting
pub mod rate_limit;

/// HTTP API
pub mod server;

/// Domain records and API response bodies
pub mod types;

/// Input validation for request parameters
pub mod validation;
