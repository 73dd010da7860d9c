mod app;
mod auth;
mod board;
mod cache;
mod config;
mod event;
mod flash;
mod github;
mod logging;
mod query;
mod request;
mod store;
mod ui;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::TokenStore;
use crate::cache::ResponseCache;
use crate::flash::FlashMessages;
use crate::github::types::MilestoneFilter;
use crate::github::{GithubClient, IssueManager};
use crate::request::{LoadingIndicator, ReqwestTransport, RequestClient, RequestNotifier};
use crate::store::{KeyValueStore, MemoryStore, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "gitsprint")]
#[command(about = "A terminal sprint board for GitHub milestones")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/gitsprint/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Repository to open, as owner/name
  #[arg(short, long)]
  repo: Option<String>,

  /// Open the board of this milestone number directly
  #[arg(short, long)]
  milestone: Option<u64>,

  /// Personal access token (default: $GITSPRINT_TOKEN or $GITHUB_TOKEN)
  #[arg(long)]
  token: Option<String>,

  /// Keep the token for later runs
  #[arg(long)]
  remember: bool,

  /// Bypass the response cache
  #[arg(long)]
  no_cache: bool,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Forget the remembered token
  Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(repo) = args.repo {
    config.github.repository = Some(repo);
  }
  if args.no_cache {
    config.cache.enabled = false;
  }

  let _log_guard = logging::init(&config)?;

  let tokens = token_store();
  if let Some(Command::Logout) = args.command {
    tokens
      .logout()
      .map_err(|e| eyre!("Failed to forget token: {}", e))?;
    println!("Logged out");
    return Ok(());
  }

  if let Some(token) = args.token.or_else(config::Config::env_token) {
    tokens
      .login(&token, args.remember)
      .map_err(|e| eyre!("Failed to store token: {}", e))?;
  }

  let repository = config
    .github
    .repository
    .clone()
    .ok_or_else(|| eyre!("No repository given; pass --repo owner/name or set github.repository"))?;
  let categories = config.board.categories()?;

  let loading = LoadingIndicator::new();
  let flash = FlashMessages::default();

  let mut requests = RequestClient::new(
    config.github.api_url.clone(),
    Arc::new(ReqwestTransport::new()?),
    tokens,
  );
  if let Some(cache) = response_cache(&config) {
    requests = requests.with_cache(cache);
  }
  requests.add_notifier(Arc::new(loading.clone()) as Arc<dyn RequestNotifier>);
  requests.add_notifier(Arc::new(flash.clone()) as Arc<dyn RequestNotifier>);

  let github = GithubClient::new(requests, repository);
  let issues = IssueManager::new(github.clone(), categories, config.board.time_labels.clone());
  info!(
    repo = %github.repo(),
    logged_in = github.is_logged_in(),
    "starting board"
  );

  let services = app::Services {
    github,
    issues,
    flash,
  };
  let mut app = app::App::new(
    services,
    loading,
    config.github.api_url.clone(),
    args.milestone.map(MilestoneFilter::Number),
  );
  app.run().await?;

  Ok(())
}

/// Session tokens live in memory; remembered ones in the durable store.
fn token_store() -> TokenStore {
  let durable: Arc<dyn KeyValueStore> = match SqliteStore::open(None) {
    Ok(store) => Arc::new(store),
    Err(e) => {
      warn!("Durable store unavailable, tokens will not be remembered: {}", e);
      Arc::new(MemoryStore::unbounded())
    }
  };
  TokenStore::new(Arc::new(MemoryStore::unbounded()), durable)
}

/// Cache in its own SQLite file, since logging out clears the durable store.
fn response_cache(config: &config::Config) -> Option<ResponseCache> {
  if !config.cache.enabled {
    return None;
  }
  let capacity = config.cache.capacity_bytes;
  let store: Arc<dyn KeyValueStore> = if config.cache.persistent {
    let path = config::Config::data_dir().join("cache.db");
    match SqliteStore::open_at(&path, Some(capacity)) {
      Ok(store) => Arc::new(store),
      Err(e) => {
        warn!("Persistent cache unavailable, using memory: {}", e);
        Arc::new(MemoryStore::with_capacity(capacity))
      }
    }
  } else {
    Arc::new(MemoryStore::with_capacity(capacity))
  };
  Some(ResponseCache::new(store).with_validity(config.cache_validity()))
}
