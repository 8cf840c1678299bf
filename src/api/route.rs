use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed route surface of the simulated backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
  ListJobs,
  GetJob,
  CreateJob,
  UpdateJob,
  ReorderJob,
  ListCandidates,
  GetCandidate,
  CreateCandidate,
  UpdateCandidate,
  AddCandidateNote,
  CandidateTimeline,
  CandidateCountsByJob,
  GetAssessment,
  PutAssessment,
  SubmitResponse,
  ListUsers,
  CreateHrManager,
}

impl Route {
  pub fn name(&self) -> &'static str {
    match self {
      Self::ListJobs => "GET /api/jobs",
      Self::GetJob => "GET /api/jobs/:id",
      Self::CreateJob => "POST /api/jobs",
      Self::UpdateJob => "PATCH /api/jobs/:id",
      Self::ReorderJob => "PATCH /api/jobs/:id/reorder",
      Self::ListCandidates => "GET /api/candidates",
      Self::GetCandidate => "GET /api/candidates/:id",
      Self::CreateCandidate => "POST /api/candidates",
      Self::UpdateCandidate => "PATCH /api/candidates/:id",
      Self::AddCandidateNote => "POST /api/candidates/:id/notes",
      Self::CandidateTimeline => "GET /api/candidates/:id/timeline",
      Self::CandidateCountsByJob => "POST /api/candidates/counts-by-job",
      Self::GetAssessment => "GET /api/assessments/:jobId",
      Self::PutAssessment => "PUT /api/assessments/:jobId",
      Self::SubmitResponse => "POST /api/assessments/:jobId/submit",
      Self::ListUsers => "GET /api/users",
      Self::CreateHrManager => "POST /api/hr-managers",
    }
  }

  /// Probability that a call fails with a server error. Reorders fail more
  /// often so rollback gets exercised.
  pub fn default_error_rate(&self) -> f64 {
    match self {
      Self::ReorderJob => 0.15,
      Self::CreateJob
      | Self::UpdateJob
      | Self::CreateCandidate
      | Self::UpdateCandidate
      | Self::AddCandidateNote
      | Self::PutAssessment
      | Self::SubmitResponse
      | Self::CreateHrManager => 0.08,
      _ => 0.10,
    }
  }

  pub fn is_write(&self) -> bool {
    !matches!(
      self,
      Self::ListJobs
        | Self::GetJob
        | Self::ListCandidates
        | Self::GetCandidate
        | Self::CandidateTimeline
        | Self::CandidateCountsByJob
        | Self::GetAssessment
        | Self::ListUsers
    )
  }
}

impl fmt::Display for Route {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}
