use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::candidates::record_event;
use crate::db::{Database, Filter, Store};
use crate::error::{Error, Result};
use crate::model::{
  Actor, Assessment, AssessmentDraft, AssessmentResponse, Candidate, ResponseStatus, Submission,
  TimelineAction,
};

fn find_by_job(s: &Store<'_>, job_id: &str) -> Result<Option<Assessment>> {
  s.first(&Filter::all().eq("job_id", job_id.to_string()))
}

pub fn get(db: &Database, job_id: &str) -> Result<Assessment> {
  db.read(|s| find_by_job(s, job_id))?
    .ok_or_else(|| Error::not_found("assessment", job_id))
}

/// Create or replace the assessment for a job. The id and creation time of
/// an existing assessment are kept.
pub fn put(
  db: &Database,
  job_id: &str,
  draft: AssessmentDraft,
  now: DateTime<Utc>,
) -> Result<Assessment> {
  db.transaction(|s| match find_by_job(s, job_id)? {
    Some(existing) => {
      let changes = json!({
        "title": draft.title,
        "description": draft.description,
        "sections": draft.sections,
        "updated_at": now,
      });
      info!(job_id, id = %existing.id, "replaced assessment");
      s.update(&existing.id, &changes)
    }
    None => {
      let assessment = Assessment {
        id: Uuid::new_v4().to_string(),
        job_id: job_id.to_string(),
        title: draft.title,
        description: draft.description,
        sections: draft.sections,
        created_at: now,
        updated_at: now,
      };
      s.insert(&assessment)?;
      info!(job_id, id = %assessment.id, "created assessment");
      Ok(assessment)
    }
  })
}

/// Record a completed response. A second response from the same candidate
/// is a conflict and writes nothing.
pub fn submit(
  db: &Database,
  job_id: &str,
  submission: Submission,
  actor: &Actor,
  now: DateTime<Utc>,
) -> Result<AssessmentResponse> {
  db.transaction(|s| {
    let assessment =
      find_by_job(s, job_id)?.ok_or_else(|| Error::not_found("assessment", job_id))?;
    let candidate: Candidate = s.require(&submission.candidate_id)?;

    let response = AssessmentResponse {
      id: Uuid::new_v4().to_string(),
      assessment_id: assessment.id,
      candidate_id: candidate.id.clone(),
      status: ResponseStatus::Completed,
      responses: submission.responses,
      submitted_at: now,
    };
    s.insert(&response)?;
    record_event(
      s,
      &candidate,
      TimelineAction::AssessmentSubmitted,
      None,
      None,
      actor,
      now,
    )?;

    info!(job_id, candidate_id = %candidate.id, "assessment submitted");
    Ok(response)
  })
}
