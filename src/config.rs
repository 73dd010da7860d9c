use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::board::{Categories, Category};
use crate::github::TimeLabels;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub github: GithubConfig,
  pub cache: CacheConfig,
  pub board: BoardConfig,
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
  pub api_url: String,
  /// `owner/name` of the repository to open
  pub repository: Option<String>,
}

impl Default for GithubConfig {
  fn default() -> Self {
    Self {
      api_url: "https://api.github.com".to_string(),
      repository: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  pub enabled: bool,
  /// Keep cached responses across runs in the SQLite store
  pub persistent: bool,
  pub validity_secs: u64,
  pub capacity_bytes: usize,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      persistent: true,
      validity_secs: 3600,
      capacity_bytes: 5 * 1024 * 1024,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
  /// Columns in display order; rules are tried in this order
  pub categories: Vec<Category>,
  pub default_category: String,
  pub time_labels: TimeLabels,
}

impl Default for BoardConfig {
  fn default() -> Self {
    let categories = Categories::default();
    Self {
      categories: categories.iter().cloned().collect(),
      default_category: categories.default_category().name.clone(),
      time_labels: TimeLabels::default(),
    }
  }
}

impl BoardConfig {
  pub fn categories(&self) -> Result<Categories> {
    Categories::new(self.categories.clone(), &self.default_category)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Filter used when GITSPRINT_LOG is unset
  pub level: String,
  /// Defaults to the data directory
  pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
      directory: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./gitsprint.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/gitsprint/config.yaml
  ///
  /// Without a config file the defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("gitsprint.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("gitsprint").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))?;
    // Surface category mistakes at startup rather than on the board
    config.board.categories()?;
    Ok(config)
  }

  /// Access token from the environment.
  ///
  /// Checks GITSPRINT_TOKEN first, then GITHUB_TOKEN as fallback.
  pub fn env_token() -> Option<String> {
    std::env::var("GITSPRINT_TOKEN")
      .or_else(|_| std::env::var("GITHUB_TOKEN"))
      .ok()
      .filter(|t| !t.trim().is_empty())
  }

  /// Directory for the log files and the SQLite store
  pub fn data_dir() -> PathBuf {
    dirs::data_dir()
      .unwrap_or_else(|| PathBuf::from("."))
      .join("gitsprint")
  }

  pub fn log_dir(&self) -> PathBuf {
    self
      .log
      .directory
      .clone()
      .unwrap_or_else(|| Self::data_dir().join("logs"))
  }

  pub fn cache_validity(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.cache.validity_secs.min(i64::MAX as u64) as i64)
  }
}
