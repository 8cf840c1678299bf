//! Local document store backed by SQLite.
//!
//! This is the only owner of persisted state. Route handlers reach it
//! through [`Database::read`] and [`Database::transaction`]; every call runs
//! synchronously while the connection lock is held.

pub mod migrations;
mod records;
pub mod schema;
mod store;

pub use schema::Table;
pub use store::{Filter, Record, Store, UniqueKey};

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::error::{Error, Result};

/// Database connection wrapper
pub struct Database {
  conn: Mutex<Connection>,
}

impl Database {
  /// Open or create the database at `path`, creating parent directories.
  pub fn open(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;
    let db = Self::with_connection(conn)?;
    info!(path = %path.display(), "opened database");
    Ok(db)
  }

  /// Fresh private database, used by tests and `--ephemeral` runs
  pub fn open_in_memory() -> Result<Self> {
    Self::with_connection(Connection::open_in_memory()?)
  }

  fn with_connection(mut conn: Connection) -> Result<Self> {
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    migrations::migrate(&mut conn)?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  /// Get the default database path
  pub fn default_path() -> Option<PathBuf> {
    dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .map(|dir| dir.join("talentflow").join("talentflow.db"))
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| Error::LockPoisoned(e.to_string()))
  }

  /// Run `f` against the store without a transaction.
  pub fn read<R>(&self, f: impl FnOnce(&Store<'_>) -> Result<R>) -> Result<R> {
    let conn = self.lock()?;
    f(&Store::new(&conn))
  }

  /// Run `f` inside one transaction. Any error rolls back every write `f`
  /// made.
  pub fn transaction<R>(&self, f: impl FnOnce(&Store<'_>) -> Result<R>) -> Result<R> {
    let mut conn = self.lock()?;
    let tx = conn.transaction()?;
    let out = f(&Store::new(&tx))?;
    tx.commit()?;
    Ok(out)
  }

  pub fn schema_version(&self) -> Result<u32> {
    let conn = self.lock()?;
    Ok(migrations::current_schema_version(&conn)?)
  }
}
