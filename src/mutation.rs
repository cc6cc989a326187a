//! Write accessors: run a backend call, then invalidate dependent queries.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;

use crate::api::ApiError;
use crate::cache::{CacheKey, QueryCache};

type MutateFn<V, R> = Arc<dyn Fn(V) -> BoxFuture<'static, Result<R, ApiError>> + Send + Sync>;
type InvalidatesFn<V, R> = Arc<dyn Fn(&R, &V) -> Vec<CacheKey> + Send + Sync>;
type OnSuccessFn<V, R> = Arc<dyn Fn(&R, &V, &QueryCache) -> Result<(), ApiError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
  Idle,
  Pending,
  Success,
  Error,
}

#[derive(Debug)]
struct MutationState {
  status: MutationStatus,
  error: Option<ApiError>,
}

/// A write operation bound to the shared cache.
///
/// On success the optional success hook runs first, then every key returned
/// by the invalidation rule is invalidated as a prefix before `mutate`
/// returns. On failure the cache is left untouched and the error is handed
/// back; nothing is retried.
pub struct Mutation<V, R> {
  cache: QueryCache,
  mutate_fn: MutateFn<V, R>,
  invalidates: InvalidatesFn<V, R>,
  on_success: Option<OnSuccessFn<V, R>>,
  state: Arc<Mutex<MutationState>>,
}

impl<V, R> Clone for Mutation<V, R> {
  fn clone(&self) -> Self {
    Self {
      cache: self.cache.clone(),
      mutate_fn: Arc::clone(&self.mutate_fn),
      invalidates: Arc::clone(&self.invalidates),
      on_success: self.on_success.clone(),
      state: Arc::clone(&self.state),
    }
  }
}

impl<V, R> Mutation<V, R>
where
  V: Clone + Send + 'static,
  R: Send + 'static,
{
  pub fn new<F, Fut>(cache: QueryCache, mutate_fn: F) -> Self
  where
    F: Fn(V) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ApiError>> + Send + 'static,
  {
    Self {
      cache,
      mutate_fn: Arc::new(move |vars: V| mutate_fn(vars).boxed()),
      invalidates: Arc::new(|_: &R, _: &V| Vec::new()),
      on_success: None,
      state: Arc::new(Mutex::new(MutationState {
        status: MutationStatus::Idle,
        error: None,
      })),
    }
  }

  /// Set the keys to invalidate after a successful call.
  pub fn invalidates<F>(mut self, f: F) -> Self
  where
    F: Fn(&R, &V) -> Vec<CacheKey> + Send + Sync + 'static,
  {
    self.invalidates = Arc::new(f);
    self
  }

  /// Run a side effect after a successful call, before invalidation.
  /// A failing hook turns the mutation into a failure.
  pub fn on_success<F>(mut self, f: F) -> Self
  where
    F: Fn(&R, &V, &QueryCache) -> Result<(), ApiError> + Send + Sync + 'static,
  {
    self.on_success = Some(Arc::new(f));
    self
  }

  fn set_state(&self, status: MutationStatus, error: Option<ApiError>) {
    let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
    state.status = status;
    state.error = error;
  }

  pub async fn mutate(&self, vars: V) -> Result<R, ApiError> {
    self.set_state(MutationStatus::Pending, None);

    let result = (self.mutate_fn)(vars.clone()).await;
    let value = match result {
      Ok(value) => value,
      Err(e) => {
        self.set_state(MutationStatus::Error, Some(e.clone()));
        return Err(e);
      }
    };

    if let Some(hook) = &self.on_success {
      if let Err(e) = hook(&value, &vars, &self.cache) {
        self.set_state(MutationStatus::Error, Some(e.clone()));
        return Err(e);
      }
    }

    let keys = (self.invalidates)(&value, &vars);
    if !keys.is_empty() {
      self.cache.invalidate_all(&keys);
    }

    self.set_state(MutationStatus::Success, None);
    Ok(value)
  }

  /// Fire-and-forget variant of [`Mutation::mutate`].
  pub fn spawn(&self, vars: V) -> JoinHandle<Result<R, ApiError>> {
    let mutation = self.clone();
    tokio::spawn(async move { mutation.mutate(vars).await })
  }

  pub fn status(&self) -> MutationStatus {
    self
      .state
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .status
  }

  pub fn error(&self) -> Option<ApiError> {
    self
      .state
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .error
      .clone()
  }

  pub fn reset(&self) {
    self.set_state(MutationStatus::Idle, None);
  }
}
