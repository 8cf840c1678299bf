use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A teammate who can be mentioned in notes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id: String,
  pub name: String,
  pub email: String,
  pub avatar_url: Option<String>,
}

/// A recruiter account. Emails are unique across HR managers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrManager {
  pub id: String,
  pub name: String,
  pub email: String,
  #[serde(default)]
  pub assigned_jobs: Vec<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewHrManager {
  #[validate(length(min = 1, message = "Name is required"))]
  pub name: String,
  #[validate(email(message = "Email is not valid"))]
  pub email: String,
  #[serde(default)]
  pub assigned_jobs: Vec<String>,
}

/// Who performed an action recorded on the timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub id: String,
  pub name: String,
}

impl Actor {
  pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      name: name.into(),
    }
  }

  /// Actor for events the system records on its own (e.g. applications)
  pub fn system() -> Self {
    Self::new("system", "System")
  }
}

impl Default for Actor {
  fn default() -> Self {
    Self::new("current-user", "Current User")
  }
}
