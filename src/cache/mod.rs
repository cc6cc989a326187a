//! Client-side cache for server state.
//!
//! This module provides the entity-agnostic machinery behind queries and
//! mutations:
//! - Hierarchical cache keys with token-wise prefix families
//! - Per-key fetch sequencing so late completions never overwrite newer data
//! - In-flight request de-duplication
//! - Prefix invalidation with immediate refetch of observed entries
//! - Garbage collection of entries nobody observes

mod key;
mod store;

pub use key::{CacheKey, Operation};
pub use store::{AnyData, CacheConfig, EntrySnapshot, Fetcher, QueryCache, QueryStatus};
