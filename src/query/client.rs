//! Keyed client-side query cache.
//!
//! Entries hold JSON values so one cache serves every resource type. Each
//! entry tracks a fetch generation: starting or cancelling a fetch bumps it,
//! and a fetch result is stored only if its generation is still current.
//! All read-modify-write operations finish under a single lock acquisition.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::key::QueryKey;
use super::state::{CacheResult, QueryState};
use crate::error::{Error, Result};

/// Change notification for subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
  Updated { key: QueryKey, version: u64 },
  Invalidated { key: QueryKey },
}

#[derive(Debug)]
struct Entry {
  key: QueryKey,
  data: Option<Value>,
  state: QueryState,
  generation: u64,
  version: u64,
  updated_at: Option<DateTime<Utc>>,
  invalidated: bool,
}

impl Entry {
  fn new(key: QueryKey) -> Self {
    Self {
      key,
      data: None,
      state: QueryState::Idle,
      generation: 0,
      version: 0,
      updated_at: None,
      invalidated: false,
    }
  }

  fn write(&mut self, data: Option<Value>) -> u64 {
    self.data = data;
    self.invalidated = false;
    self.version += 1;
    self.updated_at = Some(Utc::now());
    self.state = if self.data.is_some() {
      QueryState::Success
    } else {
      QueryState::Idle
    };
    self.version
  }
}

/// Shared handle to the query cache. Clones address the same entries.
#[derive(Clone)]
pub struct QueryClient {
  entries: Arc<Mutex<HashMap<String, Entry>>>,
  events: broadcast::Sender<CacheEvent>,
  /// How long fetched data counts as fresh
  stale_time: Duration,
}

impl Default for QueryClient {
  fn default() -> Self {
    Self::new()
  }
}

impl QueryClient {
  pub fn new() -> Self {
    let (events, _) = broadcast::channel(256);
    Self {
      entries: Arc::new(Mutex::new(HashMap::new())),
      events,
      stale_time: Duration::minutes(5),
    }
  }

  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
    self.events.subscribe()
  }

  fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>> {
    self
      .entries
      .lock()
      .map_err(|e| Error::LockPoisoned(format!("query cache: {}", e)))
  }

  fn emit(&self, event: CacheEvent) {
    // No subscribers is fine
    let _ = self.events.send(event);
  }

  // ==========================================================================
  // Reads
  // ==========================================================================

  /// Raw cached value for `key`, if any.
  pub fn get_raw(&self, key: &QueryKey) -> Result<Option<Value>> {
    Ok(
      self
        .lock()?
        .get(&key.cache_hash())
        .and_then(|entry| entry.data.clone()),
    )
  }

  pub fn get_query_data<T: DeserializeOwned>(&self, key: &QueryKey) -> Result<Option<T>> {
    self
      .get_raw(key)?
      .map(|value| serde_json::from_value(value).map_err(Error::from))
      .transpose()
  }

  pub fn state(&self, key: &QueryKey) -> Result<QueryState> {
    Ok(
      self
        .lock()?
        .get(&key.cache_hash())
        .map(|entry| entry.state.clone())
        .unwrap_or(QueryState::Idle),
    )
  }

  /// Number of writes to `key` so far.
  pub fn version(&self, key: &QueryKey) -> Result<u64> {
    Ok(
      self
        .lock()?
        .get(&key.cache_hash())
        .map(|entry| entry.version)
        .unwrap_or(0),
    )
  }

  /// True if there is no data, the entry was invalidated, or it is older
  /// than the stale time.
  pub fn is_stale(&self, key: &QueryKey) -> Result<bool> {
    let entries = self.lock()?;
    Ok(match entries.get(&key.cache_hash()) {
      Some(entry) => self.entry_is_stale(entry),
      None => true,
    })
  }

  fn entry_is_stale(&self, entry: &Entry) -> bool {
    match (&entry.data, entry.updated_at) {
      (Some(_), Some(at)) => entry.invalidated || Utc::now() - at > self.stale_time,
      _ => true,
    }
  }

  // ==========================================================================
  // Writes
  // ==========================================================================

  /// Overwrite the cached value and return the new version.
  pub fn set_query_data<T: Serialize>(&self, key: &QueryKey, data: &T) -> Result<u64> {
    let value = serde_json::to_value(data)?;
    self.set_raw(key, Some(value))
  }

  /// Overwrite or clear the cached value verbatim, e.g. to restore a snapshot.
  ///
  /// Direct writes supersede any fetch already in flight for `key`.
  pub fn set_raw(&self, key: &QueryKey, data: Option<Value>) -> Result<u64> {
    let version = {
      let mut entries = self.lock()?;
      let entry = entries
        .entry(key.cache_hash())
        .or_insert_with(|| Entry::new(key.clone()));
      entry.generation += 1;
      entry.write(data)
    };

    debug!(key = %key.description(), version, "cache write");
    self.emit(CacheEvent::Updated {
      key: key.clone(),
      version,
    });
    Ok(version)
  }

  /// Read-modify-write of one entry under a single lock acquisition.
  ///
  /// `f` sees the current typed value and returns the replacement, or `None`
  /// to leave the entry untouched (no entry is created for an unknown key).
  /// Returns the value as it was before, which callers keep as a rollback
  /// snapshot. A write supersedes any fetch in flight for `key`.
  pub fn update_query_data<T, F>(&self, key: &QueryKey, f: F) -> Result<Option<Value>>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce(Option<T>) -> Option<T>,
  {
    let (previous, version) = {
      let mut entries = self.lock()?;
      let hash = key.cache_hash();

      let previous = entries.get(&hash).and_then(|entry| entry.data.clone());
      let current: Option<T> = previous
        .clone()
        .map(serde_json::from_value)
        .transpose()?;

      match f(current) {
        Some(next) => {
          let value = serde_json::to_value(next)?;
          let entry = entries
            .entry(hash)
            .or_insert_with(|| Entry::new(key.clone()));
          entry.generation += 1;
          (previous, Some(entry.write(Some(value))))
        }
        None => (previous, None),
      }
    };

    if let Some(version) = version {
      debug!(key = %key.description(), version, "cache update");
      self.emit(CacheEvent::Updated {
        key: key.clone(),
        version,
      });
    }
    Ok(previous)
  }

  /// Drop any in-flight fetch for `key`; its result will be discarded.
  pub fn cancel_queries(&self, key: &QueryKey) -> Result<()> {
    let mut entries = self.lock()?;
    if let Some(entry) = entries.get_mut(&key.cache_hash()) {
      entry.generation += 1;
      if entry.state.is_loading() {
        entry.state = if entry.data.is_some() {
          QueryState::Success
        } else {
          QueryState::Idle
        };
      }
      debug!(key = %key.description(), generation = entry.generation, "cancelled queries");
    }
    Ok(())
  }

  /// Mark `key` stale so the next fetch goes to the backend.
  pub fn invalidate(&self, key: &QueryKey) -> Result<()> {
    let found = {
      let mut entries = self.lock()?;
      match entries.get_mut(&key.cache_hash()) {
        Some(entry) => {
          entry.invalidated = true;
          true
        }
        None => false,
      }
    };

    if found {
      debug!(key = %key.description(), "invalidated");
      self.emit(CacheEvent::Invalidated { key: key.clone() });
    }
    Ok(())
  }

  /// Mark every key at or below `prefix` stale. Returns how many matched.
  pub fn invalidate_prefix(&self, prefix: &str) -> Result<usize> {
    let keys: Vec<QueryKey> = {
      let mut entries = self.lock()?;
      entries
        .values_mut()
        .filter(|entry| entry.key.has_prefix(prefix))
        .map(|entry| {
          entry.invalidated = true;
          entry.key.clone()
        })
        .collect()
    };

    debug!(prefix, count = keys.len(), "invalidated prefix");
    let count = keys.len();
    for key in keys {
      self.emit(CacheEvent::Invalidated { key });
    }
    Ok(count)
  }

  // ==========================================================================
  // Fetching
  // ==========================================================================

  /// Start a fetch for `key` and return its generation.
  pub fn begin_fetch(&self, key: &QueryKey) -> Result<u64> {
    let mut entries = self.lock()?;
    let entry = entries
      .entry(key.cache_hash())
      .or_insert_with(|| Entry::new(key.clone()));
    entry.generation += 1;
    entry.state = QueryState::Loading;
    Ok(entry.generation)
  }

  /// Store a fetch outcome if `generation` is still current. Returns false
  /// when the result was discarded.
  pub fn complete_fetch(
    &self,
    key: &QueryKey,
    generation: u64,
    outcome: std::result::Result<Value, String>,
  ) -> Result<bool> {
    let version = {
      let mut entries = self.lock()?;
      let Some(entry) = entries.get_mut(&key.cache_hash()) else {
        return Ok(false);
      };
      if entry.generation != generation {
        debug!(
          key = %key.description(),
          generation,
          current = entry.generation,
          "discarded superseded fetch"
        );
        return Ok(false);
      }

      match outcome {
        Ok(value) => Some(entry.write(Some(value))),
        Err(message) => {
          entry.state = QueryState::Error(message);
          None
        }
      }
    };

    if let Some(version) = version {
      self.emit(CacheEvent::Updated {
        key: key.clone(),
        version,
      });
    }
    Ok(true)
  }

  /// Cache-first fetch.
  ///
  /// 1. Fresh data is returned without calling `fetcher`
  /// 2. Otherwise `fetcher` runs and its result is stored, unless a newer
  ///    write or cancel superseded it; then the cached value is returned
  /// 3. A transient failure with data cached serves that data as offline
  pub async fn fetch_query<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<CacheResult<T>>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    if let Some((data, cached_at)) = self.fresh(key)? {
      return Ok(CacheResult::from_cache(
        serde_json::from_value(data)?,
        cached_at,
        false,
      ));
    }

    let generation = self.begin_fetch(key)?;
    match fetcher().await {
      Ok(data) => {
        let value = serde_json::to_value(&data)?;
        if self.complete_fetch(key, generation, Ok(value))? {
          return Ok(CacheResult::from_network(data));
        }
        match self.cached(key)? {
          Some((current, cached_at)) => Ok(CacheResult::from_cache(
            serde_json::from_value(current)?,
            cached_at,
            true,
          )),
          None => Ok(CacheResult::from_network(data)),
        }
      }
      Err(e) => {
        self.complete_fetch(key, generation, Err(e.to_string()))?;
        match self.cached(key)? {
          Some((stale, cached_at)) if e.is_transient() => {
            warn!(key = %key.description(), error = %e, "fetch failed, serving cached data");
            Ok(CacheResult::offline(serde_json::from_value(stale)?, cached_at))
          }
          _ => Err(e),
        }
      }
    }
  }

  fn cached(&self, key: &QueryKey) -> Result<Option<(Value, DateTime<Utc>)>> {
    let entries = self.lock()?;
    Ok(entries.get(&key.cache_hash()).and_then(|entry| {
      let data = entry.data.clone()?;
      Some((data, entry.updated_at?))
    }))
  }

  fn fresh(&self, key: &QueryKey) -> Result<Option<(Value, DateTime<Utc>)>> {
    let entries = self.lock()?;
    Ok(
      entries
        .get(&key.cache_hash())
        .filter(|entry| !self.entry_is_stale(entry))
        .and_then(|entry| Some((entry.data.clone()?, entry.updated_at?))),
    )
  }
}
