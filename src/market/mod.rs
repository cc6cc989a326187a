//! Marketplace client: typed read accessors and write accessors over the
//! shared query cache.

mod admin;
mod auth;
mod dashboard;
mod jobs;
pub mod keys;
mod payments;
mod services;
mod support;
mod vendor;

pub use jobs::BidRef;

use color_eyre::Result;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::api::{ApiClient, ApiError, ApiRequest, HttpTransport, SqliteTokenStore, TokenStore, Transport};
use crate::cache::{CacheKey, QueryCache};
use crate::config::Config;
use crate::mutation::Mutation;
use crate::query::{Query, QueryOptions};

/// Dashboards change with almost every write, keep them short-lived.
pub const DASHBOARD_STALE_TIME: Duration = Duration::from_secs(30);
pub const DETAIL_STALE_TIME: Duration = Duration::from_secs(5 * 60);
pub const PROFILE_STALE_TIME: Duration = Duration::from_secs(5 * 60);
const MIN_GC_INTERVAL: Duration = Duration::from_secs(1);

/// Background eviction task, aborted when the last client clone drops.
struct GcTask(JoinHandle<()>);

impl Drop for GcTask {
  fn drop(&mut self) {
    self.0.abort();
  }
}

/// Marketplace client with a process-wide query cache.
///
/// Cloning is cheap; clones share the transport, the token store and the
/// cache.
#[derive(Clone)]
pub struct MarketClient {
  api: ApiClient,
  cache: QueryCache,
  tokens: Arc<dyn TokenStore>,
  gc: Option<Arc<GcTask>>,
}

impl MarketClient {
  /// Create a client talking to the configured backend, with the token
  /// persisted in SQLite.
  ///
  /// When called inside a tokio runtime, unobserved entries are evicted
  /// every `cache.gc_time_secs`. Outside one, call [`MarketClient::with_gc`]
  /// once a runtime is running.
  pub fn new(config: &Config) -> Result<Self> {
    let tokens: Arc<dyn TokenStore> = match &config.storage.path {
      Some(path) => Arc::new(SqliteTokenStore::open_at(path)?),
      None => Arc::new(SqliteTokenStore::open()?),
    };
    let transport = HttpTransport::new(
      &config.api.base_url,
      config.api.timeout(),
      &config.app.user_agent(),
      tokens.clone(),
    )?;
    let cache = QueryCache::new(config.cache.cache_config());

    let client = Self::with_parts(Arc::new(transport), tokens, cache);
    if tokio::runtime::Handle::try_current().is_ok() {
      return Ok(client.with_gc());
    }
    Ok(client)
  }

  /// Assemble a client from explicit parts.
  pub fn with_parts(transport: Arc<dyn Transport>, tokens: Arc<dyn TokenStore>, cache: QueryCache) -> Self {
    Self {
      api: ApiClient::new(transport),
      cache,
      tokens,
      gc: None,
    }
  }

  /// Start periodic garbage collection on the current runtime.
  ///
  /// Must be called from within a tokio runtime.
  pub fn with_gc(mut self) -> Self {
    let interval = self.cache.config().gc_time.max(MIN_GC_INTERVAL);
    self.gc = Some(Arc::new(GcTask(self.cache.spawn_gc(interval))));
    self
  }

  pub fn is_collecting_garbage(&self) -> bool {
    self.gc.is_some()
  }

  pub fn cache(&self) -> &QueryCache {
    &self.cache
  }

  pub fn api(&self) -> &ApiClient {
    &self.api
  }

  /// Whether a session token is currently stored.
  pub fn has_token(&self) -> bool {
    matches!(self.tokens.get(), Ok(Some(_)))
  }

  fn query<T>(&self, key: CacheKey, options: QueryOptions, request: ApiRequest) -> Query<T>
  where
    T: DeserializeOwned + Send + Sync + 'static,
  {
    let api = self.api.clone();
    Query::new(self.cache.clone(), key, options, move || {
      let api = api.clone();
      let request = request.clone();
      async move { api.send::<T>(request).await }
    })
  }

  /// Authenticated GET query.
  fn get_query<T>(&self, key: CacheKey, options: QueryOptions, path: impl Into<String>) -> Query<T>
  where
    T: DeserializeOwned + Send + Sync + 'static,
  {
    self.query(key, options, ApiRequest::get(path).authenticated())
  }

  fn mutation<V, R, F, Fut>(&self, mutate: F) -> Mutation<V, R>
  where
    V: Clone + Send + 'static,
    R: Send + 'static,
    F: Fn(ApiClient, V) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<R, ApiError>> + Send + 'static,
  {
    let api = self.api.clone();
    Mutation::new(self.cache.clone(), move |vars: V| mutate(api.clone(), vars))
  }
}

/// Options for a query that needs a non-empty id.
fn detail_options(id: &str) -> QueryOptions {
  QueryOptions::default()
    .enabled(!id.is_empty())
    .stale_time(DETAIL_STALE_TIME)
}
