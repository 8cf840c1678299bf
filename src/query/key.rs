//! Query keys for cached views.

use sha2::{Digest, Sha256};

use crate::model::{CandidateQuery, JobQuery};

/// Path prefix shared by every job list view
pub const JOB_LISTS: &str = "jobs/list";
/// Path prefix shared by every candidate list view
pub const CANDIDATE_LISTS: &str = "candidates/list";

/// Identifies one cached view. Lists are keyed by their full filter set, so
/// two pages of the same list are separate entries.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum QueryKey {
  JobList(JobQuery),
  JobDetail(String),
  CandidateList(CandidateQuery),
  CandidateDetail(String),
  CandidateTimeline(String),
  /// Assessment for a job id
  Assessment(String),
  Users,
}

impl QueryKey {
  /// Hierarchical path used for prefix invalidation.
  pub fn path(&self) -> String {
    match self {
      Self::JobList(query) => format!("{}/{}", JOB_LISTS, fingerprint(query)),
      Self::JobDetail(id) => format!("jobs/detail/{}", id),
      Self::CandidateList(query) => format!("{}/{}", CANDIDATE_LISTS, fingerprint(query)),
      Self::CandidateDetail(id) => format!("candidates/detail/{}", id),
      Self::CandidateTimeline(id) => format!("candidates/detail/{}/timeline", id),
      Self::Assessment(job_id) => format!("assessments/{}", job_id),
      Self::Users => "users".to_string(),
    }
  }

  /// True if this key sits at or below `prefix` in the path hierarchy.
  pub fn has_prefix(&self, prefix: &str) -> bool {
    let path = self.path();
    match path.strip_prefix(prefix) {
      Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
      None => false,
    }
  }

  /// Stable, fixed-length key for map addressing and logs.
  pub fn cache_hash(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.path().as_bytes());
    hex::encode(hasher.finalize())
  }

  pub fn description(&self) -> String {
    match self {
      Self::JobList(query) => match &query.status {
        Some(status) => format!("{} jobs, page {}", status.as_str(), query.page),
        None => format!("all jobs, page {}", query.page),
      },
      Self::JobDetail(id) => format!("job {}", id),
      Self::CandidateList(query) => match &query.stage {
        Some(stage) => format!("{} candidates, page {}", stage, query.page),
        None => format!("candidates, page {}", query.page),
      },
      Self::CandidateDetail(id) => format!("candidate {}", id),
      Self::CandidateTimeline(id) => format!("timeline for candidate {}", id),
      Self::Assessment(job_id) => format!("assessment for job {}", job_id),
      Self::Users => "users".to_string(),
    }
  }
}

/// Filter parameters as compact JSON; field order is fixed by the struct.
fn fingerprint<T: serde::Serialize>(params: &T) -> String {
  serde_json::to_string(params).unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::JobStatus;

  #[test]
  fn test_list_keys_share_prefix() {
    let active = QueryKey::JobList(JobQuery::default().with_status(JobStatus::Active));
    let archived = QueryKey::JobList(JobQuery::default().with_status(JobStatus::Archived));

    assert!(active.has_prefix(JOB_LISTS));
    assert!(archived.has_prefix("jobs"));
    assert!(!QueryKey::JobDetail("1".to_string()).has_prefix(JOB_LISTS));
    assert_ne!(active.cache_hash(), archived.cache_hash());
  }

  #[test]
  fn test_timeline_sits_under_candidate_detail() {
    let timeline = QueryKey::CandidateTimeline("c1".to_string());
    assert!(timeline.has_prefix("candidates/detail/c1"));
    assert!(!timeline.has_prefix("candidates/detail/c"));
    assert!(!timeline.has_prefix(CANDIDATE_LISTS));
  }

  #[test]
  fn test_hash_is_stable() {
    let a = QueryKey::CandidateList(CandidateQuery::default().with_job("j1"));
    let b = QueryKey::CandidateList(CandidateQuery::default().with_job("j1"));
    assert_eq!(a.cache_hash(), b.cache_hash());
    assert_eq!(a.cache_hash().len(), 64);
  }
}
