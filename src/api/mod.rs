//! REST plumbing: transport, endpoint registry, payload records and
//! persisted token storage.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod token;
pub mod transport;
pub mod types;

pub use client::ApiClient;
pub use error::{ApiError, FieldError};
pub use token::{MemoryTokenStore, SqliteTokenStore, TokenStore};
pub use transport::{ApiRequest, HttpTransport, Method, MultipartField, RequestBody, Transport};
