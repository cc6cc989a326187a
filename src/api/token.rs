//! Persisted auth token storage.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Fixed storage key for the bearer token.
pub const TOKEN_KEY: &str = "auth_token";

/// Trait for auth token storage backends.
///
/// The transport reads the token on every authenticated call, so a rotated
/// token takes effect on the next request without any cache invalidation.
pub trait TokenStore: Send + Sync {
  /// Get the current token, if any.
  fn get(&self) -> Result<Option<String>>;

  /// Persist a new token, replacing any existing one.
  fn set(&self, token: &str) -> Result<()>;

  /// Remove the persisted token.
  fn clear(&self) -> Result<()>;
}

/// In-memory token storage for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryTokenStore {
  token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_token(token: &str) -> Self {
    Self {
      token: Mutex::new(Some(token.to_string())),
    }
  }
}

impl TokenStore for MemoryTokenStore {
  fn get(&self) -> Result<Option<String>> {
    let token = self
      .token
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(token.clone())
  }

  fn set(&self, token: &str) -> Result<()> {
    let mut slot = self
      .token
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    *slot = Some(token.to_string());
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    let mut slot = self
      .token
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    *slot = None;
    Ok(())
  }
}

/// SQLite-based token storage.
pub struct SqliteTokenStore {
  conn: Mutex<Connection>,
}

impl SqliteTokenStore {
  /// Open the store at the default location.
  pub fn open() -> Result<Self> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open the store at an explicit path, creating it if needed.
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create storage directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open storage at {}: {}", path.display(), e))?;

    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;

    Ok(store)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("marketq").join("storage.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(STORAGE_SCHEMA)
      .map_err(|e| eyre!("Failed to run storage migrations: {}", e))?;

    Ok(())
  }
}

const STORAGE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl TokenStore for SqliteTokenStore {
  fn get(&self) -> Result<Option<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row(
        "SELECT value FROM kv_store WHERE key = ?",
        params![TOKEN_KEY],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read token: {}", e))
  }

  fn set(&self, token: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO kv_store (key, value, updated_at)
         VALUES (?, ?, datetime('now'))",
        params![TOKEN_KEY, token],
      )
      .map_err(|e| eyre!("Failed to store token: {}", e))?;

    Ok(())
  }

  fn clear(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM kv_store WHERE key = ?", params![TOKEN_KEY])
      .map_err(|e| eyre!("Failed to clear token: {}", e))?;

    Ok(())
  }
}
