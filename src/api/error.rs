//! Error types surfaced by the transport and propagated unchanged through
//! the query and mutation layers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single field-level validation failure reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
  pub field: String,
  pub message: String,
}

/// Errors produced by any API call.
///
/// Cloneable so that one failed fetch can be handed to every observer that
/// was waiting on it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
  /// The request never produced an HTTP response (offline, DNS, timeout).
  #[error("Network error: {0}")]
  Network(String),
  /// The backend answered with a non-2xx status.
  #[error("{message}")]
  Http {
    status: u16,
    message: String,
    details: Vec<FieldError>,
  },
  /// A 2xx body did not match the expected record type.
  #[error("Unexpected response: {0}")]
  Decode(String),
  /// The persisted auth token could not be read or written.
  #[error("Storage error: {0}")]
  Storage(String),
  #[error("Config error: {0}")]
  Config(String),
}

impl ApiError {
  /// Build an HTTP error from a status code and the raw response body.
  ///
  /// Uses the body's `message` field when the body is JSON and has one,
  /// otherwise falls back to `HTTP error: <status>`.
  pub fn from_response(status: u16, body: &[u8]) -> Self {
    let parsed = serde_json::from_slice::<Value>(body).ok();
    let message = parsed
      .as_ref()
      .and_then(|v| v.get("message"))
      .and_then(Value::as_str)
      .filter(|m| !m.is_empty())
      .map(str::to_string)
      .unwrap_or_else(|| format!("HTTP error: {}", status));
    // Malformed items are skipped so they never hide the message
    let details = parsed
      .as_ref()
      .and_then(|v| v.get("details"))
      .and_then(Value::as_array)
      .map(|items| {
        items
          .iter()
          .filter_map(|item| serde_json::from_value::<FieldError>(item.clone()).ok())
          .collect()
      })
      .unwrap_or_default();

    Self::Http {
      status,
      message,
      details,
    }
  }

  /// HTTP status code, if the backend responded at all.
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Http { status, .. } => Some(*status),
      _ => None,
    }
  }

  /// Field-level validation failures, empty for every other error kind.
  pub fn details(&self) -> &[FieldError] {
    match self {
      Self::Http { details, .. } => details,
      _ => &[],
    }
  }

  pub fn is_unauthorized(&self) -> bool {
    self.status() == Some(401)
  }

  pub fn is_validation(&self) -> bool {
    !self.details().is_empty()
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      Self::Decode(err.to_string())
    } else {
      Self::Network(err.to_string())
    }
  }
}

impl From<serde_json::Error> for ApiError {
  fn from(err: serde_json::Error) -> Self {
    Self::Decode(err.to_string())
  }
}
