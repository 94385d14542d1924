use anyhow::{Context, Result};
use clap::Parser;
use git_wayback::config::Config;
use git_wayback::server::{AppState, run_server};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    long_version = env!("GIT_WAYBACK_LONG_VERSION"),
    about = "Repository history visualization backend",
    long_about = None
)]
struct Args {
    /// Socket address to listen on
    #[arg(long)]
    bind: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long, env = "GIT_WAYBACK_CONFIG")]
    config: Option<PathBuf>,

    /// JSON file backing the evolution snapshot store
    #[arg(long)]
    store_path: Option<PathBuf>,

    /// Directory holding local clones for analysis
    #[arg(long)]
    repos_dir: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default()?,
    };
    config.apply_env_overrides();

    if let Some(bind) = &args.bind {
        config.server.bind = bind.clone();
    }
    if let Some(path) = &args.store_path {
        config.store.path = Some(path.clone());
    }
    if let Some(dir) = &args.repos_dir {
        config.analysis.repos_dir = dir.clone();
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("git_wayback=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();
    tracing::info!(
        "git-wayback {} (commit {}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_WAYBACK_COMMIT"),
        env!("GIT_WAYBACK_BUILT_AT")
    );
    let config = load_config(&args)?;

    for issue in config.missing_required() {
        tracing::warn!("{}; running degraded", issue);
    }

    let bind = config.server.bind.clone();
    let sweep_interval = Duration::from_secs(config.rate_limit.sweep_interval_secs);
    let state = Arc::new(AppState::from_config(config)?);

    let shutdown = CancellationToken::new();
    let sweeper = state
        .rate_limiter
        .clone()
        .spawn_sweeper(sweep_interval, shutdown.clone());

    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutting down");
                signal.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
        }
    });

    let stopped = shutdown.clone();
    run_server(state, &bind, async move { stopped.cancelled().await }).await?;

    shutdown.cancel();
    sweeper.await?;
    Ok(())
}
