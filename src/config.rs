use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::mock::{Dataset, MockRemote, DEFAULT_PAGE_SIZE};
use crate::cache::ResponseCache;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub remote: RemoteConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
  /// Maximum number of cached responses. Unbounded when unset or zero.
  pub capacity: Option<usize>,
}

impl CacheConfig {
  pub fn build(&self) -> ResponseCache {
    ResponseCache::from_capacity(self.capacity)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
  /// Simulated latency per remote call, in milliseconds
  #[serde(default = "default_latency_ms")]
  pub latency_ms: u64,
  /// Transactions per page
  #[serde(default = "default_page_size")]
  pub page_size: usize,
  /// JSON dataset to serve instead of the built-in one
  pub data_file: Option<PathBuf>,
}

fn default_latency_ms() -> u64 {
  300
}

fn default_page_size() -> usize {
  DEFAULT_PAGE_SIZE
}

impl Default for RemoteConfig {
  fn default() -> Self {
    Self {
      latency_ms: default_latency_ms(),
      page_size: default_page_size(),
      data_file: None,
    }
  }
}

impl RemoteConfig {
  /// Build the in-memory remote described by this section.
  pub fn build(&self) -> Result<MockRemote> {
    let dataset = match &self.data_file {
      Some(path) => Dataset::load(path)?,
      None => Dataset::builtin(),
    };

    Ok(
      MockRemote::new(dataset)
        .with_latency(Duration::from_millis(self.latency_ms))
        .with_page_size(self.page_size),
    )
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
  /// Default filter directive; `RUST_LOG` takes precedence
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Write logs to this file instead of stderr
  pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      file: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./txcache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/txcache/config.yaml
  ///
  /// Falls back to defaults when no file is found and no path was given.
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

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };
    config.validate()?;

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("txcache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("txcache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    // An empty file is a valid, all-defaults config
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents)
  }

  pub fn validate(&self) -> Result<()> {
    if self.remote.page_size == 0 {
      return Err(eyre!("remote.page_size must be greater than zero"));
    }
    Ok(())
  }
}
