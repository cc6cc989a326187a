//! Client-side query cache and invalidation layer for the job marketplace
//! REST API.

pub mod api;
pub mod cache;
pub mod config;
pub mod market;
pub mod mutation;
pub mod query;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiClient, ApiError};
pub use cache::{CacheKey, QueryCache, QueryStatus};
pub use market::MarketClient;
pub use mutation::{Mutation, MutationStatus};
pub use query::{Query, QueryOptions, QueryState};
