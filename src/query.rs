//! Read accessors bound to cache keys.
//!
//! Inspired by TanStack Query, a `Query<T>` observes one entry of the shared
//! [`QueryCache`]. Observers of the same key share one in-flight fetch, serve
//! stale data while revalidating in the background, and are notified whenever
//! the entry changes.
//!
//! # Example
//!
//! ```ignore
//! let mut query = market.job("j1");
//!
//! // Start fetching (no-op while fresh or already in flight)
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // Entry changed, trigger re-render
//! }
//!
//! // In render
//! let state = query.state();
//! match state.status {
//!     QueryStatus::Loading => render_spinner(),
//!     QueryStatus::Error => render_error(state.error),
//!     _ => render_data(state.data),
//! }
//! ```

use futures::FutureExt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::api::ApiError;
use crate::cache::{AnyData, CacheKey, Fetcher, QueryCache, QueryStatus};

/// Per-accessor options.
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
  /// When false the fetch function is never called and status is `Idle`
  pub enabled: bool,
  /// Freshness window; falls back to the cache default when unset
  pub stale_time: Option<Duration>,
}

impl Default for QueryOptions {
  fn default() -> Self {
    Self {
      enabled: true,
      stale_time: None,
    }
  }
}

impl QueryOptions {
  pub fn enabled(mut self, enabled: bool) -> Self {
    self.enabled = enabled;
    self
  }

  pub fn stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = Some(stale_time);
    self
  }
}

/// What an observer sees of its entry.
#[derive(Debug, Clone)]
pub struct QueryState<T> {
  pub status: QueryStatus,
  pub data: Option<Arc<T>>,
  pub error: Option<ApiError>,
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    self.status == QueryStatus::Loading
  }

  pub fn is_fetching(&self) -> bool {
    self.status.is_fetching()
  }

  pub fn is_success(&self) -> bool {
    self.data.is_some() && self.error.is_none()
  }

  pub fn is_error(&self) -> bool {
    self.status == QueryStatus::Error
  }
}

/// Condition re-checked on every call, for queries that depend on state
/// outside the cache such as a stored session token.
type EnabledFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// Observer of one cache entry.
pub struct Query<T> {
  key: CacheKey,
  cache: QueryCache,
  fetcher: Fetcher,
  stale_time: Duration,
  enabled: bool,
  condition: Option<EnabledFn>,
  registered: bool,
  receiver: watch::Receiver<u64>,
  _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Query<T> {
  /// Create a query bound to `key`.
  ///
  /// The fetcher is called each time the cache decides the entry needs
  /// data. Nothing is fetched until `fetch()` is called, but an enabled
  /// query counts as an observer immediately, so invalidations of its key
  /// refetch in the background.
  pub fn new<F, Fut>(cache: QueryCache, key: CacheKey, options: QueryOptions, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let fetcher: Fetcher = Arc::new(move || {
      let fut = fetcher();
      async move { fut.await.map(|data| Arc::new(data) as AnyData) }.boxed()
    });
    let receiver = cache.subscribe(&key);
    if options.enabled {
      cache.register_observer(&key, fetcher.clone());
    }
    let stale_time = options.stale_time.unwrap_or(cache.config().stale_time);

    Self {
      key,
      cache,
      fetcher,
      stale_time,
      enabled: options.enabled,
      condition: None,
      registered: options.enabled,
      receiver,
      _marker: PhantomData,
    }
  }

  pub fn key(&self) -> &CacheKey {
    &self.key
  }

  /// Gate the query on `condition` as well as its `enabled` flag.
  ///
  /// The condition is evaluated on every `fetch`, `refetch` and `state`
  /// call, so a query built while it is false starts working once it
  /// turns true.
  pub fn enabled_when<F>(mut self, condition: F) -> Self
  where
    F: Fn() -> bool + Send + Sync + 'static,
  {
    self.condition = Some(Arc::new(condition));
    self.sync_observer();
    self
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled && self.condition.as_ref().map_or(true, |condition| condition())
  }

  /// Match the observer registration to the current enabled state.
  fn sync_observer(&mut self) -> bool {
    let enabled = self.is_enabled();
    if enabled && !self.registered {
      self.cache.register_observer(&self.key, self.fetcher.clone());
    } else if !enabled && self.registered {
      self.cache.unregister_observer(&self.key);
      if self.cache.observer_count(&self.key) == 0 {
        self.cache.cancel(&self.key);
      }
    }
    self.registered = enabled;
    enabled
  }

  /// Enable or disable the query.
  ///
  /// Disabling while a fetch is in flight discards its result on arrival
  /// unless another enabled observer still wants it.
  pub fn set_enabled(&mut self, enabled: bool) {
    self.enabled = enabled;
    self.sync_observer();
  }

  /// Fetch if the entry is missing, failed or stale.
  ///
  /// Cached data stays readable while a background refetch runs. Returns
  /// whether a fetch was started; always false when disabled or when a
  /// fetch for the key is already in flight.
  pub fn fetch(&mut self) -> bool {
    if !self.sync_observer() {
      return false;
    }
    self
      .cache
      .ensure(&self.key, self.stale_time, self.fetcher.clone())
  }

  /// Force a new fetch even if one is already in flight. The newest fetch
  /// wins regardless of completion order.
  pub fn refetch(&mut self) -> bool {
    if !self.sync_observer() {
      return false;
    }
    self.cache.refetch(&self.key, self.fetcher.clone());
    true
  }

  pub fn state(&self) -> QueryState<T> {
    if !self.is_enabled() {
      return QueryState {
        status: QueryStatus::Idle,
        data: None,
        error: None,
      };
    }

    match self.cache.snapshot(&self.key) {
      Some(snapshot) => {
        let expired = snapshot
          .updated_at
          .map(|t| t.elapsed() > self.stale_time)
          .unwrap_or(false);
        let status = match snapshot.status {
          QueryStatus::Fresh if expired => QueryStatus::Stale,
          status => status,
        };
        QueryState {
          status,
          data: snapshot.data.and_then(|d| d.downcast::<T>().ok()),
          error: snapshot.error,
        }
      }
      None => QueryState {
        status: QueryStatus::Idle,
        data: None,
        error: None,
      },
    }
  }

  pub fn status(&self) -> QueryStatus {
    self.state().status
  }

  pub fn data(&self) -> Option<Arc<T>> {
    self.state().data
  }

  pub fn error(&self) -> Option<ApiError> {
    self.state().error
  }

  pub fn is_stale(&self) -> bool {
    self.status() == QueryStatus::Stale
  }

  /// Check for entry changes since the last poll.
  ///
  /// Returns `true` if the entry changed. Call this in your event loop tick
  /// handler.
  pub fn poll(&mut self) -> bool {
    match self.receiver.has_changed() {
      Ok(true) => {
        self.receiver.borrow_and_update();
        true
      }
      _ => false,
    }
  }

  /// Wait for the next change of the entry.
  pub async fn changed(&mut self) -> bool {
    self.receiver.changed().await.is_ok()
  }

  /// Fetch if needed and wait until nothing is in flight.
  ///
  /// Resolves with the cached data, the fetch error, or `None` when the
  /// query is disabled.
  pub async fn resolve(&mut self) -> Result<Option<Arc<T>>, ApiError> {
    self.fetch();
    loop {
      let state = self.state();
      if !state.is_fetching() {
        return match (state.status, state.error) {
          (QueryStatus::Error, Some(e)) => Err(e),
          _ => Ok(state.data),
        };
      }
      if !self.changed().await {
        return Ok(self.data());
      }
    }
  }
}

impl<T> Drop for Query<T> {
  fn drop(&mut self) {
    if self.registered {
      self.cache.unregister_observer(&self.key);
    }
  }
}

impl<T> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.key)
      .field("enabled", &self.enabled)
      .field("gated", &self.condition.is_some())
      .field("stale_time", &self.stale_time)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
  use std::sync::Mutex;
  use tokio::sync::oneshot;

  async fn settle() {
    for _ in 0..10 {
      tokio::task::yield_now().await;
    }
  }

  fn counted(counter: Arc<AtomicU32>) -> impl Fn() -> futures::future::Ready<Result<u32, ApiError>> {
    move || futures::future::ready(Ok(counter.fetch_add(1, Ordering::SeqCst) + 1))
  }

  #[tokio::test]
  async fn test_query_success() {
    let cache = QueryCache::default();
    let mut query = Query::new(
      cache,
      CacheKey::from(["jobs"]),
      QueryOptions::default(),
      || async { Ok::<_, ApiError>(vec![1, 2, 3]) },
    );

    assert_eq!(query.status(), QueryStatus::Idle);

    assert!(query.fetch());
    assert!(query.state().is_loading());

    assert!(query.changed().await);
    settle().await;
    assert!(query.state().is_success());
    assert_eq!(query.data().as_deref(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_query_error() {
    let cache = QueryCache::default();
    let mut query: Query<i32> = Query::new(
      cache,
      CacheKey::from(["payments"]),
      QueryOptions::default(),
      || async { Err(ApiError::Network("Something went wrong".to_string())) },
    );

    let result = query.resolve().await;
    assert_eq!(result, Err(ApiError::Network("Something went wrong".to_string())));
    assert!(query.state().is_error());
  }

  #[tokio::test]
  async fn test_disabled_query_never_fetches() {
    let cache = QueryCache::default();
    let counter = Arc::new(AtomicU32::new(0));
    let mut query = Query::new(
      cache,
      CacheKey::from(["jobs", "byId", ""]),
      QueryOptions::default().enabled(false),
      counted(counter.clone()),
    );

    assert!(!query.fetch());
    assert!(!query.refetch());
    assert_eq!(query.resolve().await, Ok(None));
    settle().await;

    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert_eq!(query.status(), QueryStatus::Idle);
  }

  #[tokio::test]
  async fn test_concurrent_observers_share_one_fetch() {
    let cache = QueryCache::default();
    let counter = Arc::new(AtomicU32::new(0));
    let key = CacheKey::from(["jobs", "open"]);

    let mut first = Query::new(cache.clone(), key.clone(), QueryOptions::default(), counted(counter.clone()));
    let mut second = Query::new(cache.clone(), key, QueryOptions::default(), counted(counter.clone()));

    assert!(first.fetch());
    assert!(!second.fetch());

    let (a, b) = tokio::join!(first.resolve(), second.resolve());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(a.unwrap().as_deref(), Some(&1));
    assert_eq!(b.unwrap().as_deref(), Some(&1));
  }

  #[tokio::test]
  async fn test_fresh_entry_served_without_refetch() {
    let cache = QueryCache::default();
    let counter = Arc::new(AtomicU32::new(0));
    let mut query = Query::new(
      cache,
      CacheKey::from(["services"]),
      QueryOptions::default().stale_time(Duration::from_secs(60)),
      counted(counter.clone()),
    );

    query.resolve().await.unwrap();
    assert!(!query.fetch());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(query.status(), QueryStatus::Fresh);
  }

  #[tokio::test]
  async fn test_stale_while_revalidate() {
    let cache = QueryCache::default();
    let counter = Arc::new(AtomicU32::new(0));
    let mut query = Query::new(
      cache,
      CacheKey::from(["jobs"]),
      QueryOptions::default().stale_time(Duration::from_millis(20)),
      counted(counter.clone()),
    );

    query.resolve().await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(query.is_stale());

    // Re-observing serves the cached value immediately
    assert!(query.fetch());
    assert!(!query.fetch());
    assert_eq!(query.status(), QueryStatus::StaleRefetching);
    assert_eq!(query.data().as_deref(), Some(&1));

    assert!(query.changed().await);
    settle().await;
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(query.data().as_deref(), Some(&2));
    assert_eq!(query.status(), QueryStatus::Fresh);
  }

  #[tokio::test]
  async fn test_out_of_order_completion_keeps_newest() {
    let cache = QueryCache::default();
    let (first_tx, first_rx) = oneshot::channel::<()>();
    let (second_tx, second_rx) = oneshot::channel::<()>();
    let gates = Arc::new(Mutex::new(vec![second_rx, first_rx]));
    let issued = Arc::new(AtomicU32::new(0));

    let mut query = Query::new(cache, CacheKey::from(["jobs", "open"]), QueryOptions::default(), {
      let gates = gates.clone();
      let issued = issued.clone();
      move || {
        let gate = gates.lock().unwrap().pop();
        let n = issued.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
          if let Some(gate) = gate {
            let _ = gate.await;
          }
          Ok::<_, ApiError>(n)
        }
      }
    });

    query.refetch();
    query.refetch();
    settle().await;

    second_tx.send(()).unwrap();
    assert!(query.changed().await);
    settle().await;
    assert_eq!(query.data().as_deref(), Some(&2));
    assert_eq!(query.status(), QueryStatus::Fresh);

    first_tx.send(()).unwrap();
    settle().await;
    assert_eq!(query.data().as_deref(), Some(&2));
  }

  #[tokio::test]
  async fn test_disable_while_in_flight_discards_result() {
    let cache = QueryCache::default();
    let (tx, rx) = oneshot::channel::<()>();
    let gate = Arc::new(Mutex::new(Some(rx)));

    let mut query = Query::new(cache.clone(), CacheKey::from(["jobs", "byId", "j9"]), QueryOptions::default(), {
      let gate = gate.clone();
      move || {
        let gate = gate.lock().unwrap().take();
        async move {
          if let Some(gate) = gate {
            let _ = gate.await;
          }
          Ok::<_, ApiError>("job")
        }
      }
    });

    query.fetch();
    settle().await;
    query.set_enabled(false);
    tx.send(()).unwrap();
    settle().await;

    assert!(cache.get_query_data::<&str>(query.key()).is_none());
    assert_eq!(query.status(), QueryStatus::Idle);
  }

  #[tokio::test]
  async fn test_poll_reports_changes_once() {
    let cache = QueryCache::default();
    let mut query = Query::new(
      cache.clone(),
      CacheKey::from(["vendor", "earnings"]),
      QueryOptions::default(),
      || async { Ok::<_, ApiError>(10) },
    );

    assert!(!query.poll());
    query.fetch();
    assert!(query.poll());
    assert!(!query.poll());

    query.resolve().await.unwrap();
    cache.invalidate(query.key());
    assert!(query.poll());
  }

  #[tokio::test]
  async fn test_condition_is_rechecked_on_each_call() {
    let cache = QueryCache::default();
    let counter = Arc::new(AtomicU32::new(0));
    let open = Arc::new(AtomicBool::new(false));
    let key = CacheKey::from(["auth", "me"]);
    let mut query = Query::new(cache.clone(), key.clone(), QueryOptions::default(), counted(counter.clone()))
      .enabled_when({
        let open = open.clone();
        move || open.load(Ordering::SeqCst)
      });

    assert!(!query.fetch());
    assert_eq!(cache.observer_count(&key), 0);

    open.store(true, Ordering::SeqCst);
    assert_eq!(query.resolve().await.unwrap().as_deref(), Some(&1));
    assert_eq!(query.status(), QueryStatus::Fresh);
    assert_eq!(cache.observer_count(&key), 1);

    open.store(false, Ordering::SeqCst);
    assert_eq!(query.status(), QueryStatus::Idle);
    assert!(!query.refetch());
    assert_eq!(cache.observer_count(&key), 0);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_drop_unregisters_observer() {
    let cache = QueryCache::default();
    let key = CacheKey::from(["jobs"]);
    let query = Query::new(cache.clone(), key.clone(), QueryOptions::default(), || async {
      Ok::<_, ApiError>(0)
    });
    assert_eq!(cache.observer_count(&key), 1);
    drop(query);
    assert_eq!(cache.observer_count(&key), 0);
  }
}
