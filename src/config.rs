use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheConfig;

/// Environment variable overriding `api.base_url`.
pub const API_URL_ENV: &str = "MARKETQ_API_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub app: AppConfig,
  #[serde(default)]
  pub cache: CacheSettings,
  #[serde(default)]
  pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  pub base_url: String,
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
  15_000
}

impl ApiConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_millis(self.timeout_ms)
  }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
  Development,
  #[default]
  Production,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  #[serde(default = "default_app_name")]
  pub name: String,
  #[serde(default)]
  pub environment: Environment,
}

fn default_app_name() -> String {
  env!("CARGO_PKG_NAME").to_string()
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      name: default_app_name(),
      environment: Environment::default(),
    }
  }
}

impl AppConfig {
  /// User agent sent with every request: `<name>/<crate version>`.
  pub fn user_agent(&self) -> String {
    format!("{}/{}", self.name, env!("CARGO_PKG_VERSION"))
  }

  /// Default log filter when `MARKETQ_LOG` is unset.
  pub fn default_log_filter(&self) -> &'static str {
    match self.environment {
      Environment::Development => "marketq=debug,info",
      Environment::Production => "info",
    }
  }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CacheSettings {
  #[serde(default = "default_stale_time_secs")]
  pub stale_time_secs: u64,
  #[serde(default = "default_gc_time_secs")]
  pub gc_time_secs: u64,
}

fn default_stale_time_secs() -> u64 {
  60
}

fn default_gc_time_secs() -> u64 {
  5 * 60
}

impl Default for CacheSettings {
  fn default() -> Self {
    Self {
      stale_time_secs: default_stale_time_secs(),
      gc_time_secs: default_gc_time_secs(),
    }
  }
}

impl CacheSettings {
  pub fn cache_config(&self) -> CacheConfig {
    CacheConfig {
      stale_time: Duration::from_secs(self.stale_time_secs),
      gc_time: Duration::from_secs(self.gc_time_secs),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
  /// Token database location (defaults to the platform data directory)
  pub path: Option<PathBuf>,
}

impl Config {
  /// Configuration with defaults everywhere except the backend URL.
  pub fn with_base_url(base_url: &str) -> Self {
    Self {
      api: ApiConfig {
        base_url: base_url.to_string(),
        timeout_ms: default_timeout_ms(),
      },
      app: AppConfig::default(),
      cache: CacheSettings::default(),
      storage: StorageConfig::default(),
    }
  }

  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./marketq.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/marketq/config.yaml
  ///
  /// Without a file, `MARKETQ_API_URL` alone is enough to run with defaults.
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

    let env_url = std::env::var(API_URL_ENV).ok();
    let config = match (path, env_url.as_deref()) {
      (Some(p), _) => Self::load_from_path(&p)?,
      (None, Some(url)) => Self::with_base_url(url),
      (None, None) => {
        return Err(eyre!(
          "No configuration file found. Create one at ~/.config/marketq/config.yaml\n\
                 or set {} to the backend URL.",
          API_URL_ENV
        ))
      }
    };

    Ok(config.with_env_override(env_url))
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("marketq.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("marketq").join("config.yaml");
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

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    url::Url::parse(&config.api.base_url)
      .map_err(|e| eyre!("Invalid api.base_url '{}': {}", config.api.base_url, e))?;
    Ok(config)
  }

  fn with_env_override(mut self, env_url: Option<String>) -> Self {
    if let Some(url) = env_url.filter(|u| !u.is_empty()) {
      self.api.base_url = url;
    }
    self
  }
}
