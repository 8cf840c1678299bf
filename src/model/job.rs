use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::ordering::Ordered;

/// Whether a job is open for applications. Lists in display order show
/// active jobs before archived ones.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
  #[default]
  Active,
  Archived,
}

impl JobStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Active => "active",
      Self::Archived => "archived",
    }
  }
}

impl std::str::FromStr for JobStatus {
  type Err = crate::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "active" => Ok(Self::Active),
      "archived" => Ok(Self::Archived),
      other => Err(crate::Error::Validation(format!(
        "unknown job status '{}' (expected active or archived)",
        other
      ))),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Salary {
  pub min: u32,
  pub max: u32,
  pub currency: String,
  pub period: String,
}

/// A job posting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
  pub id: String,
  pub title: String,
  /// URL-friendly unique identifier
  pub slug: String,
  #[serde(default)]
  pub description: String,
  pub status: JobStatus,
  #[serde(default)]
  pub tags: Vec<String>,
  pub salary: Option<Salary>,
  pub location: Option<String>,
  /// Display position within the status partition (dense, zero-based)
  pub order: i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Ordered for Job {
  fn key(&self) -> &str {
    &self.id
  }

  fn set_order(&mut self, order: i64) {
    self.order = order;
  }
}

/// Input for creating a job
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_new_job_salary"))]
pub struct NewJob {
  #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
  pub title: String,
  /// Derived from the title when absent
  #[validate(length(min = 1, message = "Slug cannot be empty"))]
  pub slug: Option<String>,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub status: JobStatus,
  #[serde(default)]
  pub tags: Vec<String>,
  pub salary: Option<Salary>,
  pub location: Option<String>,
}

fn validate_new_job_salary(job: &NewJob) -> Result<(), ValidationError> {
  validate_salary(job.salary.as_ref())
}

/// Partial update for a job; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_patch_salary"))]
pub struct JobPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<JobStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tags: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub salary: Option<Salary>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
}

fn validate_patch_salary(patch: &JobPatch) -> Result<(), ValidationError> {
  validate_salary(patch.salary.as_ref())
}

fn validate_salary(salary: Option<&Salary>) -> Result<(), ValidationError> {
  match salary {
    Some(s) if s.min > s.max => {
      let mut err = ValidationError::new("salary_range");
      err.message = Some("Salary minimum cannot exceed maximum".into());
      Err(err)
    }
    _ => Ok(()),
  }
}

/// Sort key for job lists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobSort {
  #[default]
  Order,
  Title,
  CreatedAt,
}

/// Filter parameters for a job list view
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobQuery {
  pub search: Option<String>,
  pub status: Option<JobStatus>,
  pub page: usize,
  pub page_size: usize,
  pub sort: JobSort,
}

impl Default for JobQuery {
  fn default() -> Self {
    Self {
      search: None,
      status: None,
      page: 1,
      page_size: 10,
      sort: JobSort::Order,
    }
  }
}

impl JobQuery {
  pub fn with_status(mut self, status: JobStatus) -> Self {
    self.status = Some(status);
    self
  }

  pub fn with_search(mut self, search: impl Into<String>) -> Self {
    self.search = Some(search.into());
    self
  }

  pub fn with_page(mut self, page: usize, page_size: usize) -> Self {
    self.page = page;
    self.page_size = page_size;
    self
  }

  /// Case-insensitive match on title or any tag
  pub fn matches(&self, job: &Job) -> bool {
    match self.search.as_deref().map(str::trim) {
      None | Some("") => true,
      Some(term) => {
        let term = term.to_lowercase();
        job.title.to_lowercase().contains(&term)
          || job.tags.iter().any(|t| t.to_lowercase().contains(&term))
      }
    }
  }

  /// Only views in display order can be reordered by position.
  pub fn check_reorderable(&self) -> crate::Result<()> {
    match self.sort {
      JobSort::Order => Ok(()),
      _ => Err(crate::Error::Validation(
        "jobs can only be reordered in a list sorted by order".to_string(),
      )),
    }
  }
}

/// True when every status forms one contiguous run, active first, the way
/// list views show them. A reorder that breaks this would need a status
/// change, not a move.
pub fn statuses_grouped(jobs: &[Job]) -> bool {
  jobs.windows(2).all(|pair| pair[0].status <= pair[1].status)
}

/// Build a URL-friendly slug from a title.
pub fn slugify(title: &str) -> String {
  let cleaned: String = title
    .to_lowercase()
    .chars()
    .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '-')
    .collect();

  let mut slug = String::with_capacity(cleaned.len());
  for c in cleaned.split_whitespace().collect::<Vec<_>>().join("-").chars() {
    if c == '-' && slug.ends_with('-') {
      continue;
    }
    slug.push(c);
  }

  slug.trim_matches('-').to_string()
}
