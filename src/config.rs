use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::{FaultSettings, Route};
use crate::db::Database;
use crate::model::Actor;

/// Runtime settings. Every field has a default, so no file is required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub database: DatabaseConfig,
  pub cache: CacheConfig,
  pub transport: TransportConfig,
  pub seed: SeedConfig,
  /// Who timeline events are attributed to
  pub actor: Actor,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
  /// Defaults to the platform data directory
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Seconds before cached views count as stale
  pub stale_time_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_time_secs: 300,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
  pub min_latency_ms: u64,
  pub max_latency_ms: u64,
  /// Overrides every route's default error rate
  pub error_rate: Option<f64>,
  /// Per-route overrides, e.g. `reorder_job: 0.5`
  pub route_error_rates: BTreeMap<Route, f64>,
  /// Fixes the fault sequence for reproducible runs
  pub rng_seed: Option<u64>,
}

impl Default for TransportConfig {
  fn default() -> Self {
    Self {
      min_latency_ms: 200,
      max_latency_ms: 1200,
      error_rate: None,
      route_error_rates: BTreeMap::new(),
      rng_seed: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
  /// Seed the store on first start
  pub auto: bool,
  /// Generator seed for demo data
  pub value: u64,
}

impl Default for SeedConfig {
  fn default() -> Self {
    Self {
      auto: true,
      value: 42,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./talentflow.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/talentflow/config.yaml
  ///
  /// Without a file the defaults apply.
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
    let local = PathBuf::from("talentflow.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("talentflow").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    let t = &self.transport;
    if t.min_latency_ms > t.max_latency_ms {
      return Err(eyre!(
        "transport.min_latency_ms ({}) is above max_latency_ms ({})",
        t.min_latency_ms,
        t.max_latency_ms
      ));
    }

    let rates = t.error_rate.iter().chain(t.route_error_rates.values());
    if let Some(rate) = rates.copied().find(|r| !(0.0..=1.0).contains(r)) {
      return Err(eyre!("error rates must be between 0 and 1, got {}", rate));
    }
    Ok(())
  }

  pub fn database_path(&self) -> Result<PathBuf> {
    self
      .database
      .path
      .clone()
      .or_else(Database::default_path)
      .ok_or_else(|| eyre!("No data directory found. Set database.path in the config file."))
  }

  pub fn stale_time(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.cache.stale_time_secs as i64)
  }

  pub fn fault_settings(&self) -> FaultSettings {
    let t = &self.transport;
    FaultSettings {
      min_latency: Duration::from_millis(t.min_latency_ms),
      max_latency: Duration::from_millis(t.max_latency_ms),
      error_rate: t.error_rate,
      route_error_rates: t.route_error_rates.clone(),
      seed: t.rng_seed,
    }
  }
}
