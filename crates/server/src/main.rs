//! namewatch entry point.
//!
//! `run` serves the lookup API; `index` provisions the cache expiry index and
//! exits. Logging goes to stderr as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use namewatch_client::{ChannelResolver, DiscordChannel, DiscordConfig, ResolverConfig};
use namewatch_core::{AppConfig, CacheDb, ConfigFile};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod admission;
mod error;
mod jobs;
mod lookup;
mod response;
mod routes;
mod server;
mod state;

#[cfg(test)]
mod testing;

use admission::RateLimitState;
use jobs::ExpirySweepJob;
use lookup::Lookup;
use state::AppState;

#[derive(Parser)]
#[command(name = "namewatch")]
#[command(version)]
#[command(about = "Name availability lookup service with a self-expiring cache")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Serve the lookup API (default)
    Run,
    /// Create the cache expiry index and exit
    Index,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let path = AppConfig::resolve_path(cli.config.as_deref());

    if AppConfig::ensure_file(&path)? == ConfigFile::Created {
        warn!(
            path = %path.display(),
            "No configuration found. A template was written; fill in discord_token and channel_id, then start again"
        );
        return Ok(());
    }

    let config = AppConfig::load_from(&path)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::Index => index(config).await,
    }
}

async fn run(config: AppConfig) -> Result<()> {
    let (token, channel_id) = config.require_channel()?;

    info!("Starting namewatch v{}", env!("CARGO_PKG_VERSION"));

    let store = CacheDb::open(&config.db_path).await?;

    let channel = DiscordChannel::new(DiscordConfig {
        token: token.to_string(),
        channel_id: channel_id.to_string(),
        base_url: config.discord_api_base.clone(),
        user_agent: config.user_agent.clone(),
        ..Default::default()
    })?;
    let resolver = ChannelResolver::new(
        Arc::new(channel),
        ResolverConfig { timeout: config.resolve_timeout(), poll_interval: config.poll_interval(), ..Default::default() },
    );

    let admission = RateLimitState::new(config.rate_limit_requests, config.rate_limit_window())
        .with_forwarded_headers(config.trust_forwarded_headers);
    info!(
        burst = admission.burst(),
        window_secs = config.rate_limit_window_secs,
        trust_forwarded_headers = admission.trusts_forwarded_headers(),
        "Rate limiting lookups per client"
    );
    let lookup = Lookup::new(Arc::new(store.clone()), Arc::new(resolver), config.cache_ttl());
    let state = AppState { lookup: Arc::new(lookup), admission: admission.clone() };

    let shutdown = CancellationToken::new();
    let sweep = Arc::new(
        ExpirySweepJob::new(store, admission)
            .with_interval(config.sweep_interval())
            .with_cancellation(shutdown.clone()),
    )
    .start();
    tokio::spawn(server::cancel_on_ctrl_c(shutdown.clone()));

    let served = server::start_web_server(config.bind_addr, state, shutdown.clone()).await;

    shutdown.cancel();
    if let Err(e) = sweep.await {
        warn!(error = %e, "Expiry sweep task ended abnormally");
    }

    served?;
    info!("Server shutdown complete");
    Ok(())
}

async fn index(config: AppConfig) -> Result<()> {
    let store = CacheDb::open(&config.db_path).await?;

    let existed = store.has_expiry_index().await?;
    if !existed {
        store.create_expiry_index().await?;
    }
    if !store.has_expiry_index().await? {
        anyhow::bail!("expiry index {} was not created", namewatch_core::cache::EXPIRY_INDEX);
    }
    let purged = store.purge_expired().await?;
    let remaining = store.count_names().await?;

    info!(
        db_path = %config.db_path.display(),
        index = namewatch_core::cache::EXPIRY_INDEX,
        created = !existed,
        purged,
        remaining,
        "Expiry index ready"
    );
    Ok(())
}
