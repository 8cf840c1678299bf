//! Collection operations over the document tables.

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::schema::Table;
use crate::error::{Error, Result};

/// A type persisted in one of the store's tables.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
  const TABLE: Table;
  /// Name used in not-found and conflict messages
  const ENTITY: &'static str;

  fn id(&self) -> &str;

  /// Secondary uniqueness rule checked before the record is created.
  ///
  /// The check and the insert are separate statements. Inside a transaction
  /// on the single connection this is safe; it is not safe against a second
  /// process writing the same file.
  fn unique_key(&self) -> Option<UniqueKey> {
    None
  }
}

/// Lookup that must come back empty for a create to proceed
#[derive(Debug, Clone)]
pub struct UniqueKey {
  pub filter: Filter,
  pub message: String,
}

/// Equality filter over indexed columns with an optional ordering.
///
/// Results without an explicit order come back in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Filter {
  conditions: Vec<(&'static str, SqlValue)>,
  order_by: Option<(&'static str, bool)>,
}

impl Filter {
  pub fn all() -> Self {
    Self::default()
  }

  pub fn eq(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
    self.conditions.push((column, value.into()));
    self
  }

  pub fn order_by(mut self, column: &'static str) -> Self {
    self.order_by = Some((column, false));
    self
  }

  pub fn order_by_desc(mut self, column: &'static str) -> Self {
    self.order_by = Some((column, true));
    self
  }

  fn to_sql(&self, table: Table, select: &str, ordered: bool) -> Result<(String, Vec<SqlValue>)> {
    let mut sql = format!("SELECT {} FROM {}", select, table.name());
    let mut values = Vec::with_capacity(self.conditions.len());

    for (i, (column, value)) in self.conditions.iter().enumerate() {
      ensure_column(table, column)?;
      sql.push_str(if i == 0 { " WHERE " } else { " AND " });
      sql.push_str(&format!("{} = ?{}", column, i + 1));
      values.push(value.clone());
    }

    match self.order_by.filter(|_| ordered) {
      Some((column, desc)) => {
        ensure_column(table, column)?;
        let direction = if desc { "DESC" } else { "ASC" };
        sql.push_str(&format!(" ORDER BY {} {}, rowid {}", column, direction, direction));
      }
      None if ordered => sql.push_str(" ORDER BY rowid"),
      None => {}
    }

    Ok((sql, values))
  }
}

fn ensure_column(table: Table, column: &str) -> Result<()> {
  if table.has_column(column) {
    Ok(())
  } else {
    Err(Error::Validation(format!(
      "{} is not an indexed column of {}",
      column,
      table.name()
    )))
  }
}

/// Store operations bound to one connection or open transaction.
pub struct Store<'c> {
  conn: &'c Connection,
}

impl<'c> Store<'c> {
  pub fn new(conn: &'c Connection) -> Self {
    Self { conn }
  }

  /// Create a record. Rejects duplicate ids and any violated uniqueness rule
  /// with [`Error::Conflict`] without writing anything.
  pub fn insert<T: Record>(&self, record: &T) -> Result<()> {
    if let Some(unique) = record.unique_key() {
      if self.first::<T>(&unique.filter)?.is_some() {
        warn!(table = T::TABLE.name(), id = record.id(), "uniqueness guard rejected create");
        return Err(Error::Conflict(unique.message));
      }
    }

    let data = serde_json::to_string(record)?;
    let sql = format!("INSERT INTO {} (id, data) VALUES (?1, ?2)", T::TABLE.name());

    match self.conn.execute(&sql, params![record.id(), data]) {
      Ok(_) => {
        debug!(table = T::TABLE.name(), id = record.id(), "inserted record");
        Ok(())
      }
      Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => Err(
        Error::Conflict(format!("{} {} already exists", T::ENTITY, record.id())),
      ),
      Err(e) => Err(e.into()),
    }
  }

  /// Insert many records; the first failure aborts with that error.
  pub fn bulk_insert<T: Record>(&self, records: &[T]) -> Result<usize> {
    for record in records {
      self.insert(record)?;
    }
    debug!(table = T::TABLE.name(), count = records.len(), "bulk insert");
    Ok(records.len())
  }

  pub fn get<T: Record>(&self, id: &str) -> Result<Option<T>> {
    let sql = format!("SELECT data FROM {} WHERE id = ?1", T::TABLE.name());
    let data: Option<String> = self
      .conn
      .query_row(&sql, params![id], |row| row.get(0))
      .optional()?;

    data
      .map(|d| serde_json::from_str(&d).map_err(Error::from))
      .transpose()
  }

  /// Like [`Store::get`] but a missing record is an error.
  pub fn require<T: Record>(&self, id: &str) -> Result<T> {
    self
      .get(id)?
      .ok_or_else(|| Error::not_found(T::ENTITY, id))
  }

  /// Merge `patch` into the stored document (JSON merge patch) and return
  /// the updated record.
  pub fn update<T: Record, P: Serialize>(&self, id: &str, patch: &P) -> Result<T> {
    let patch = serde_json::to_string(patch)?;
    let sql = format!(
      "UPDATE {} SET data = json_patch(data, ?2) WHERE id = ?1",
      T::TABLE.name()
    );

    let changed = self.conn.execute(&sql, params![id, patch])?;
    if changed == 0 {
      return Err(Error::not_found(T::ENTITY, id));
    }

    debug!(table = T::TABLE.name(), id, "updated record");
    self.require(id)
  }

  pub fn delete<T: Record>(&self, id: &str) -> Result<bool> {
    let sql = format!("DELETE FROM {} WHERE id = ?1", T::TABLE.name());
    Ok(self.conn.execute(&sql, params![id])? > 0)
  }

  pub fn query<T: Record>(&self, filter: &Filter) -> Result<Vec<T>> {
    let (sql, values) = filter.to_sql(T::TABLE, "data", true)?;
    let mut stmt = self.conn.prepare(&sql)?;

    let rows = stmt
      .query_map(params_from_iter(values.iter()), |row| row.get::<_, String>(0))?
      .collect::<rusqlite::Result<Vec<String>>>()?;

    rows
      .iter()
      .map(|data| serde_json::from_str(data).map_err(Error::from))
      .collect()
  }

  pub fn first<T: Record>(&self, filter: &Filter) -> Result<Option<T>> {
    Ok(self.query::<T>(filter)?.into_iter().next())
  }

  pub fn count<T: Record>(&self, filter: &Filter) -> Result<usize> {
    let (sql, values) = filter.to_sql(T::TABLE, "COUNT(*)", false)?;
    let count: i64 = self
      .conn
      .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
    Ok(count as usize)
  }

  pub fn clear<T: Record>(&self) -> Result<usize> {
    let sql = format!("DELETE FROM {}", T::TABLE.name());
    Ok(self.conn.execute(&sql, [])?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::Database;
  use serde::Deserialize;

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Manager {
    id: String,
    email: String,
  }

  impl Record for Manager {
    const TABLE: Table = Table::HrManagers;
    const ENTITY: &'static str = "manager";

    fn id(&self) -> &str {
      &self.id
    }

    fn unique_key(&self) -> Option<UniqueKey> {
      Some(UniqueKey {
        filter: Filter::all().eq("email", self.email.clone()),
        message: format!("manager with email {} already exists", self.email),
      })
    }
  }

  fn manager(id: &str, email: &str) -> Manager {
    Manager {
      id: id.to_string(),
      email: email.to_string(),
    }
  }

  #[test]
  fn test_duplicate_primary_key_is_conflict() {
    let db = Database::open_in_memory().unwrap();
    db.transaction(|s| s.insert(&manager("m1", "a@example.com")))
      .unwrap();

    let err = db
      .transaction(|s| s.insert(&manager("m1", "b@example.com")))
      .unwrap_err();
    assert!(err.is_conflict());
  }

  #[test]
  fn test_unique_key_guard() {
    let db = Database::open_in_memory().unwrap();
    db.transaction(|s| s.insert(&manager("m1", "a@example.com")))
      .unwrap();

    let err = db
      .transaction(|s| s.insert(&manager("m2", "a@example.com")))
      .unwrap_err();
    assert!(err.is_conflict());

    let count = db
      .read(|s| s.count::<Manager>(&Filter::all()))
      .unwrap();
    assert_eq!(count, 1);
  }

  #[test]
  fn test_update_merges_and_reports_missing() {
    let db = Database::open_in_memory().unwrap();
    db.transaction(|s| s.insert(&manager("m1", "a@example.com")))
      .unwrap();

    let updated: Manager = db
      .transaction(|s| s.update("m1", &serde_json::json!({ "email": "z@example.com" })))
      .unwrap();
    assert_eq!(updated, manager("m1", "z@example.com"));

    let err = db
      .transaction(|s| s.update::<Manager, _>("nope", &serde_json::json!({ "email": "x" })))
      .unwrap_err();
    assert!(err.is_not_found());
  }

  #[test]
  fn test_query_filters_on_index_only() {
    let db = Database::open_in_memory().unwrap();
    db.transaction(|s| {
      s.bulk_insert(&[
        manager("m1", "a@example.com"),
        manager("m2", "b@example.com"),
      ])
    })
    .unwrap();

    let found: Vec<Manager> = db
      .read(|s| s.query(&Filter::all().eq("email", "b@example.com".to_string())))
      .unwrap();
    assert_eq!(found, vec![manager("m2", "b@example.com")]);

    let err = db
      .read(|s| s.query::<Manager>(&Filter::all().eq("name", "x".to_string())))
      .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn test_delete_and_clear() {
    let db = Database::open_in_memory().unwrap();
    db.transaction(|s| {
      s.bulk_insert(&[
        manager("m1", "a@example.com"),
        manager("m2", "b@example.com"),
        manager("m3", "c@example.com"),
      ])
    })
    .unwrap();

    assert!(db.transaction(|s| s.delete::<Manager>("m1")).unwrap());
    assert!(!db.transaction(|s| s.delete::<Manager>("m1")).unwrap());
    assert_eq!(db.transaction(|s| s.clear::<Manager>()).unwrap(), 2);
  }
}
