//! Schema versioning through `PRAGMA user_version`.

use rusqlite::{types::Type, Connection};

use super::schema;

/// Latest schema version understood by this binary.
pub const LATEST_SCHEMA_VERSION: u32 = 1;

const MIGRATIONS: &[(u32, &str)] = &[(1, schema::MIGRATION_V1_SQL)];

pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
  let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
  u32::try_from(version)
    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(e)))
}

/// Apply pending migrations in ascending order, each in its own transaction.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
  let mut current = current_schema_version(conn)?;

  for (version, sql) in MIGRATIONS {
    if *version <= current {
      continue;
    }

    let tx = conn.transaction()?;
    tx.execute_batch(sql)?;
    tx.pragma_update(None, "user_version", i64::from(*version))?;
    tx.commit()?;
    tracing::debug!(version, "applied schema migration");
    current = *version;
  }

  Ok(current)
}
