//! Process-wide query cache: entries, fetch sequencing, invalidation and
//! observer notification.

use futures::future::BoxFuture;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::key::CacheKey;
use crate::api::ApiError;

/// Type-erased cached value.
pub type AnyData = Arc<dyn Any + Send + Sync>;

/// Type-erased fetch function registered by observers.
pub type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, Result<AnyData, ApiError>> + Send + Sync>;

/// Lifecycle of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
  /// No data and nothing in flight
  Idle,
  /// First fetch in flight, no data yet
  Loading,
  /// Data present and trusted
  Fresh,
  /// Data present but invalidated or expired
  Stale,
  /// Data present, refetch in flight
  StaleRefetching,
  /// Last fetch failed; previous data, if any, is kept
  Error,
}

impl QueryStatus {
  pub fn is_fetching(&self) -> bool {
    matches!(self, QueryStatus::Loading | QueryStatus::StaleRefetching)
  }
}

/// Cache-wide timing configuration.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
  /// Default freshness window for queries that do not set their own
  pub stale_time: Duration,
  /// How long an unobserved entry survives before garbage collection
  pub gc_time: Duration,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_time: Duration::from_secs(60),
      gc_time: Duration::from_secs(5 * 60),
    }
  }
}

/// Point-in-time view of one entry.
#[derive(Clone)]
pub struct EntrySnapshot {
  pub status: QueryStatus,
  pub data: Option<AnyData>,
  pub error: Option<ApiError>,
  pub updated_at: Option<Instant>,
  pub invalidated: bool,
}

struct CacheEntry {
  data: Option<AnyData>,
  error: Option<ApiError>,
  status: QueryStatus,
  updated_at: Option<Instant>,
  invalidated: bool,
  /// Sequence number of the newest fetch still outstanding
  in_flight: Option<u64>,
  /// Completions with a sequence number at or below this are discarded
  floor: u64,
  touched_at: Instant,
}

impl CacheEntry {
  fn new(floor: u64) -> Self {
    Self {
      data: None,
      error: None,
      status: QueryStatus::Idle,
      updated_at: None,
      invalidated: false,
      in_flight: None,
      floor,
      touched_at: Instant::now(),
    }
  }

  fn is_stale(&self, stale_time: Duration) -> bool {
    self.invalidated
      || self
        .updated_at
        .map(|t| t.elapsed() > stale_time)
        .unwrap_or(true)
  }

  /// Status once nothing is in flight.
  fn settled_status(&self) -> QueryStatus {
    if self.error.is_some() {
      QueryStatus::Error
    } else if self.data.is_none() {
      QueryStatus::Idle
    } else if self.invalidated {
      QueryStatus::Stale
    } else {
      QueryStatus::Fresh
    }
  }

  fn snapshot(&self) -> EntrySnapshot {
    EntrySnapshot {
      status: self.status,
      data: self.data.clone(),
      error: self.error.clone(),
      updated_at: self.updated_at,
      invalidated: self.invalidated,
    }
  }
}

/// Observers and the notification channel for one key.
///
/// Kept apart from the entry so that subscriptions survive `clear()`.
struct Subscription {
  observers: usize,
  fetcher: Option<Fetcher>,
  notify: watch::Sender<u64>,
}

impl Subscription {
  fn new() -> Self {
    let (notify, _) = watch::channel(0);
    Self {
      observers: 0,
      fetcher: None,
      notify,
    }
  }
}

#[derive(Default)]
struct CacheInner {
  entries: HashMap<CacheKey, CacheEntry>,
  subscriptions: HashMap<CacheKey, Subscription>,
  last_seq: u64,
}

impl CacheInner {
  fn entry(&mut self, key: &CacheKey) -> &mut CacheEntry {
    let floor = self.last_seq;
    let entry = self
      .entries
      .entry(key.clone())
      .or_insert_with(|| CacheEntry::new(floor));
    entry.touched_at = Instant::now();
    entry
  }

  fn notify(&self, key: &CacheKey) {
    if let Some(sub) = self.subscriptions.get(key) {
      sub.notify.send_modify(|version| *version = version.wrapping_add(1));
    }
  }

  fn is_observed(&self, key: &CacheKey) -> bool {
    self
      .subscriptions
      .get(key)
      .map(|s| s.observers > 0)
      .unwrap_or(false)
  }

  /// Issue a new fetch for `key`. The caller spawns it after unlocking.
  fn begin_fetch(&mut self, key: &CacheKey, fetcher: Fetcher) -> PendingFetch {
    self.last_seq += 1;
    let seq = self.last_seq;
    let entry = self.entry(key);
    entry.in_flight = Some(seq);
    entry.status = if entry.data.is_some() {
      QueryStatus::StaleRefetching
    } else {
      QueryStatus::Loading
    };
    self.notify(key);
    tracing::trace!(key = %key, seq, "fetch started");
    PendingFetch {
      key: key.clone(),
      seq,
      fetcher,
    }
  }
}

struct PendingFetch {
  key: CacheKey,
  seq: u64,
  fetcher: Fetcher,
}

/// Shared query cache.
///
/// Cloning is cheap and every clone refers to the same entries. The lock is
/// never held across an await point.
#[derive(Clone)]
pub struct QueryCache {
  inner: Arc<Mutex<CacheInner>>,
  config: CacheConfig,
}

impl Default for QueryCache {
  fn default() -> Self {
    Self::new(CacheConfig::default())
  }
}

impl QueryCache {
  pub fn new(config: CacheConfig) -> Self {
    Self {
      inner: Arc::new(Mutex::new(CacheInner::default())),
      config,
    }
  }

  pub fn config(&self) -> &CacheConfig {
    &self.config
  }

  fn lock(&self) -> MutexGuard<'_, CacheInner> {
    // Entries are always left consistent before anything can panic.
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn spawn_fetches(&self, pending: Vec<PendingFetch>) {
    for fetch in pending {
      let cache = self.clone();
      tokio::spawn(async move {
        let result = (fetch.fetcher)().await;
        cache.complete(&fetch.key, fetch.seq, result);
      });
    }
  }

  /// Subscribe to change notifications for `key`.
  pub fn subscribe(&self, key: &CacheKey) -> watch::Receiver<u64> {
    let mut inner = self.lock();
    inner
      .subscriptions
      .entry(key.clone())
      .or_insert_with(Subscription::new)
      .notify
      .subscribe()
  }

  /// Register an active observer. Observed entries are refetched as soon
  /// as they are invalidated, using the most recently registered fetcher.
  pub fn register_observer(&self, key: &CacheKey, fetcher: Fetcher) {
    let mut inner = self.lock();
    let sub = inner
      .subscriptions
      .entry(key.clone())
      .or_insert_with(Subscription::new);
    sub.observers += 1;
    sub.fetcher = Some(fetcher);
  }

  pub fn unregister_observer(&self, key: &CacheKey) {
    let mut inner = self.lock();
    if let Some(sub) = inner.subscriptions.get_mut(key) {
      sub.observers = sub.observers.saturating_sub(1);
    }
    if let Some(entry) = inner.entries.get_mut(key) {
      entry.touched_at = Instant::now();
    }
  }

  pub fn observer_count(&self, key: &CacheKey) -> usize {
    self
      .lock()
      .subscriptions
      .get(key)
      .map(|s| s.observers)
      .unwrap_or(0)
  }

  pub fn snapshot(&self, key: &CacheKey) -> Option<EntrySnapshot> {
    self.lock().entries.get(key).map(CacheEntry::snapshot)
  }

  pub fn status(&self, key: &CacheKey) -> QueryStatus {
    self
      .lock()
      .entries
      .get(key)
      .map(|e| e.status)
      .unwrap_or(QueryStatus::Idle)
  }

  /// Serve from cache, fetching only when needed.
  ///
  /// Starts a fetch when the entry is missing, failed, invalidated or older
  /// than `stale_time`, unless one is already in flight. Returns whether a
  /// fetch was started.
  pub fn ensure(&self, key: &CacheKey, stale_time: Duration, fetcher: Fetcher) -> bool {
    let pending = {
      let mut inner = self.lock();
      let entry = inner.entry(key);
      let needs_fetch = entry.in_flight.is_none()
        && (entry.data.is_none() || entry.error.is_some() || entry.is_stale(stale_time));
      if !needs_fetch {
        return false;
      }
      inner.begin_fetch(key, fetcher)
    };
    self.spawn_fetches(vec![pending]);
    true
  }

  /// Start a fetch unconditionally. A newer fetch always wins over any
  /// fetch still in flight for the same key.
  pub fn refetch(&self, key: &CacheKey, fetcher: Fetcher) {
    let pending = self.lock().begin_fetch(key, fetcher);
    self.spawn_fetches(vec![pending]);
  }

  /// Apply a fetch completion.
  ///
  /// Discarded when the entry no longer exists, or when a newer fetch has
  /// already completed or the fetch was cancelled.
  fn complete(&self, key: &CacheKey, seq: u64, result: Result<AnyData, ApiError>) {
    let mut guard = self.lock();
    let inner = &mut *guard;

    let Some(entry) = inner.entries.get_mut(key) else {
      tracing::trace!(key = %key, seq, "discarding completion for evicted entry");
      return;
    };
    if seq <= entry.floor {
      tracing::debug!(key = %key, seq, floor = entry.floor, "discarding out-of-order completion");
      return;
    }

    entry.floor = seq;
    if entry.in_flight == Some(seq) {
      entry.in_flight = None;
    }
    entry.touched_at = Instant::now();

    match result {
      Ok(data) => {
        entry.data = Some(data);
        entry.error = None;
        entry.updated_at = Some(Instant::now());
        entry.invalidated = false;
      }
      Err(e) => {
        tracing::debug!(key = %key, error = %e, "query fetch failed");
        entry.error = Some(e);
      }
    }

    entry.status = match entry.in_flight {
      Some(_) if entry.data.is_some() => QueryStatus::StaleRefetching,
      Some(_) => QueryStatus::Loading,
      None => entry.settled_status(),
    };

    inner.notify(key);
  }

  /// Drop whatever is in flight for `key`; its result will be ignored.
  pub fn cancel(&self, key: &CacheKey) {
    let mut guard = self.lock();
    let inner = &mut *guard;
    let last_seq = inner.last_seq;
    let Some(entry) = inner.entries.get_mut(key) else {
      return;
    };
    if entry.in_flight.take().is_none() {
      return;
    }
    entry.floor = last_seq;
    entry.status = entry.settled_status();
    tracing::trace!(key = %key, "in-flight fetch cancelled");
    inner.notify(key);
  }

  /// Mark every entry under `prefix` stale.
  ///
  /// Observed entries refetch immediately; unobserved entries drop any
  /// fetch in flight and wait to be observed again. Returns the number of
  /// entries affected.
  pub fn invalidate(&self, prefix: &CacheKey) -> usize {
    self.invalidate_all(std::slice::from_ref(prefix))
  }

  pub fn invalidate_all(&self, prefixes: &[CacheKey]) -> usize {
    let (count, pending) = {
      let mut guard = self.lock();
      let inner = &mut *guard;
      let matching: Vec<CacheKey> = inner
        .entries
        .keys()
        .filter(|key| prefixes.iter().any(|p| p.is_prefix_of(key)))
        .cloned()
        .collect();

      let last_seq = inner.last_seq;
      let mut pending = Vec::new();
      for key in &matching {
        let fetcher = inner
          .subscriptions
          .get(key)
          .filter(|s| s.observers > 0)
          .and_then(|s| s.fetcher.clone());

        if let Some(entry) = inner.entries.get_mut(key) {
          entry.invalidated = true;
          if entry.status == QueryStatus::Fresh {
            entry.status = QueryStatus::Stale;
          }
          if fetcher.is_none() && entry.in_flight.take().is_some() {
            entry.floor = last_seq;
            entry.status = entry.settled_status();
          }
        }

        match fetcher {
          Some(fetcher) => pending.push(inner.begin_fetch(key, fetcher)),
          None => inner.notify(key),
        }
      }
      (matching.len(), pending)
    };

    tracing::debug!(
      prefixes = ?prefixes.iter().map(ToString::to_string).collect::<Vec<_>>(),
      count,
      refetching = pending.len(),
      "invalidated cache entries"
    );
    self.spawn_fetches(pending);
    count
  }

  /// Remove every entry. Observers stay subscribed and see `Idle`.
  pub fn clear(&self) {
    let mut inner = self.lock();
    let removed = inner.entries.len();
    inner.entries.clear();
    for sub in inner.subscriptions.values() {
      sub.notify.send_modify(|version| *version = version.wrapping_add(1));
    }
    tracing::debug!(removed, "cache cleared");
  }

  pub fn get_query_data<T: Send + Sync + 'static>(&self, key: &CacheKey) -> Option<Arc<T>> {
    let data = self.lock().entries.get(key).and_then(|e| e.data.clone())?;
    data.downcast::<T>().ok()
  }

  /// Write a value directly, superseding any fetch in flight.
  pub fn set_query_data<T: Send + Sync + 'static>(&self, key: &CacheKey, value: T) {
    let mut inner = self.lock();
    let last_seq = inner.last_seq;
    let entry = inner.entry(key);
    entry.data = Some(Arc::new(value));
    entry.error = None;
    entry.updated_at = Some(Instant::now());
    entry.invalidated = false;
    entry.in_flight = None;
    entry.floor = last_seq;
    entry.status = QueryStatus::Fresh;
    inner.notify(key);
  }

  pub fn len(&self) -> usize {
    self.lock().entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn keys(&self) -> Vec<CacheKey> {
    let mut keys: Vec<CacheKey> = self.lock().entries.keys().cloned().collect();
    keys.sort();
    keys
  }

  /// Evict entries nobody has observed or touched for `gc_time`.
  pub fn collect_garbage(&self) -> usize {
    let mut guard = self.lock();
    let inner = &mut *guard;
    let gc_time = self.config.gc_time;

    let expired: Vec<CacheKey> = inner
      .entries
      .iter()
      .filter(|(key, entry)| {
        entry.in_flight.is_none()
          && entry.touched_at.elapsed() >= gc_time
          && !inner.is_observed(key)
      })
      .map(|(key, _)| key.clone())
      .collect();

    for key in &expired {
      inner.entries.remove(key);
      tracing::trace!(key = %key, "evicted unobserved entry");
    }

    let entries = &inner.entries;
    inner.subscriptions.retain(|key, sub| {
      sub.observers > 0 || sub.notify.receiver_count() > 0 || entries.contains_key(key)
    });

    expired.len()
  }

  /// Run garbage collection periodically on the current runtime.
  pub fn spawn_gc(&self, interval: Duration) -> JoinHandle<()> {
    let cache = self.clone();
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(interval);
      loop {
        ticker.tick().await;
        let evicted = cache.collect_garbage();
        if evicted > 0 {
          tracing::debug!(evicted, "cache garbage collected");
        }
      }
    })
  }
}
