use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::db::{Database, Filter};
use crate::error::Result;
use crate::model::{HrManager, NewHrManager, User};

pub fn list(db: &Database) -> Result<Vec<User>> {
  let mut users: Vec<User> = db.read(|s| s.query(&Filter::all()))?;
  users.sort_by(|a, b| a.name.cmp(&b.name));
  Ok(users)
}

pub fn create_hr_manager(
  db: &Database,
  input: NewHrManager,
  now: DateTime<Utc>,
) -> Result<HrManager> {
  db.transaction(|s| {
    let manager = HrManager {
      id: Uuid::new_v4().to_string(),
      name: input.name,
      email: input.email,
      assigned_jobs: input.assigned_jobs,
      created_at: now,
    };
    s.insert(&manager)?;
    info!(id = %manager.id, "created HR manager");
    Ok(manager)
  })
}
