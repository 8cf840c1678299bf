//! Table bindings and uniqueness rules for domain types.

use super::schema::Table;
use super::store::{Filter, Record, UniqueKey};
use crate::model::{
  Assessment, AssessmentResponse, Candidate, HrManager, Job, TimelineEvent, User,
};

// ============================================================================
// Records with uniqueness rules
// ============================================================================

impl Record for Job {
  const TABLE: Table = Table::Jobs;
  const ENTITY: &'static str = "job";

  fn id(&self) -> &str {
    &self.id
  }

  fn unique_key(&self) -> Option<UniqueKey> {
    Some(UniqueKey {
      filter: Filter::all().eq("slug", self.slug.clone()),
      message: format!("A job with slug '{}' already exists.", self.slug),
    })
  }
}

impl Record for HrManager {
  const TABLE: Table = Table::HrManagers;
  const ENTITY: &'static str = "HR manager";

  fn id(&self) -> &str {
    &self.id
  }

  fn unique_key(&self) -> Option<UniqueKey> {
    Some(UniqueKey {
      filter: Filter::all().eq("email", self.email.clone()),
      message: "An HR Manager with this email already exists.".to_string(),
    })
  }
}

impl Record for Assessment {
  const TABLE: Table = Table::Assessments;
  const ENTITY: &'static str = "assessment";

  fn id(&self) -> &str {
    &self.id
  }

  // Saves go through the upsert handler; this only stops a second create
  fn unique_key(&self) -> Option<UniqueKey> {
    Some(UniqueKey {
      filter: Filter::all().eq("job_id", self.job_id.clone()),
      message: format!("Job {} already has an assessment.", self.job_id),
    })
  }
}

impl Record for AssessmentResponse {
  const TABLE: Table = Table::AssessmentResponses;
  const ENTITY: &'static str = "assessment response";

  fn id(&self) -> &str {
    &self.id
  }

  fn unique_key(&self) -> Option<UniqueKey> {
    Some(UniqueKey {
      filter: Filter::all()
        .eq("assessment_id", self.assessment_id.clone())
        .eq("candidate_id", self.candidate_id.clone()),
      message: "A response for this candidate and assessment already exists.".to_string(),
    })
  }
}

// ============================================================================
// Records keyed by id only
// ============================================================================

impl Record for Candidate {
  const TABLE: Table = Table::Candidates;
  const ENTITY: &'static str = "candidate";

  fn id(&self) -> &str {
    &self.id
  }
}

impl Record for TimelineEvent {
  const TABLE: Table = Table::CandidateTimeline;
  const ENTITY: &'static str = "timeline event";

  fn id(&self) -> &str {
    &self.id
  }
}

impl Record for User {
  const TABLE: Table = Table::Users;
  const ENTITY: &'static str = "user";

  fn id(&self) -> &str {
    &self.id
  }
}
