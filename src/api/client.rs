//! Typed client for the simulated backend.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use validator::Validate;

use super::handlers::{assessments, candidates, jobs, users};
use super::route::Route;
use super::transport::Transport;
use crate::db::Database;
use crate::error::Result;
use crate::model::{
  Actor, Assessment, AssessmentDraft, AssessmentResponse, Candidate, CandidatePatch,
  CandidateQuery, HrManager, Job, JobPatch, JobQuery, NewCandidate, NewHrManager, NewJob, NewNote,
  Page, Submission, TimelineEvent, User,
};

/// Calls route handlers through a [`Transport`].
///
/// Input is validated before the request leaves the client. A transport
/// failure means the handler never ran.
#[derive(Clone)]
pub struct ApiClient {
  db: Arc<Database>,
  transport: Arc<dyn Transport>,
  actor: Actor,
}

impl ApiClient {
  pub fn new(db: Arc<Database>, transport: Arc<dyn Transport>) -> Self {
    Self {
      db,
      transport,
      actor: Actor::default(),
    }
  }

  /// Attribute timeline events to `actor`.
  pub fn with_actor(mut self, actor: Actor) -> Self {
    self.actor = actor;
    self
  }

  pub fn actor(&self) -> &Actor {
    &self.actor
  }

  pub fn database(&self) -> &Arc<Database> {
    &self.db
  }

  async fn call<R>(&self, route: Route, handler: impl FnOnce(&Database) -> Result<R>) -> Result<R> {
    self.transport.deliver(route).await?;
    handler(&self.db)
  }

  // ==========================================================================
  // Jobs
  // ==========================================================================

  pub async fn list_jobs(&self, query: &JobQuery) -> Result<Page<Job>> {
    self.call(Route::ListJobs, |db| jobs::list(db, query)).await
  }

  pub async fn get_job(&self, id: &str) -> Result<Job> {
    self.call(Route::GetJob, |db| jobs::get(db, id)).await
  }

  pub async fn create_job(&self, input: NewJob) -> Result<Job> {
    input.validate()?;
    self
      .call(Route::CreateJob, |db| jobs::create(db, input, Utc::now()))
      .await
  }

  pub async fn update_job(&self, id: &str, patch: &JobPatch) -> Result<Job> {
    patch.validate()?;
    self
      .call(Route::UpdateJob, |db| jobs::update(db, id, patch, Utc::now()))
      .await
  }

  /// Move a job within the list view `query` describes; positions are
  /// indices into that view.
  pub async fn reorder_job(
    &self,
    id: &str,
    query: &JobQuery,
    from_order: usize,
    to_order: usize,
  ) -> Result<()> {
    query.check_reorderable()?;
    self
      .call(Route::ReorderJob, |db| {
        jobs::reorder(db, id, query, from_order, to_order)
      })
      .await
  }

  // ==========================================================================
  // Candidates
  // ==========================================================================

  pub async fn list_candidates(&self, query: &CandidateQuery) -> Result<Page<Candidate>> {
    self
      .call(Route::ListCandidates, |db| candidates::list(db, query))
      .await
  }

  pub async fn get_candidate(&self, id: &str) -> Result<Candidate> {
    self
      .call(Route::GetCandidate, |db| candidates::get(db, id))
      .await
  }

  pub async fn create_candidate(&self, input: NewCandidate) -> Result<Candidate> {
    input.validate()?;
    self
      .call(Route::CreateCandidate, |db| {
        candidates::create(db, input, Utc::now())
      })
      .await
  }

  pub async fn update_candidate(&self, id: &str, patch: &CandidatePatch) -> Result<Candidate> {
    patch.validate()?;
    self
      .call(Route::UpdateCandidate, |db| {
        candidates::update(db, id, patch, &self.actor, Utc::now())
      })
      .await
  }

  pub async fn add_note(&self, id: &str, input: NewNote) -> Result<Candidate> {
    input.validate()?;
    self
      .call(Route::AddCandidateNote, |db| {
        candidates::add_note(db, id, input, &self.actor, Utc::now())
      })
      .await
  }

  pub async fn candidate_timeline(&self, id: &str) -> Result<Vec<TimelineEvent>> {
    self
      .call(Route::CandidateTimeline, |db| candidates::timeline(db, id))
      .await
  }

  pub async fn candidate_counts(&self, job_ids: &[String]) -> Result<BTreeMap<String, usize>> {
    self
      .call(Route::CandidateCountsByJob, |db| {
        candidates::counts_by_job(db, job_ids)
      })
      .await
  }

  // ==========================================================================
  // Assessments
  // ==========================================================================

  pub async fn get_assessment(&self, job_id: &str) -> Result<Assessment> {
    self
      .call(Route::GetAssessment, |db| assessments::get(db, job_id))
      .await
  }

  pub async fn put_assessment(&self, job_id: &str, draft: AssessmentDraft) -> Result<Assessment> {
    draft.validate()?;
    self
      .call(Route::PutAssessment, |db| {
        assessments::put(db, job_id, draft, Utc::now())
      })
      .await
  }

  pub async fn submit_response(
    &self,
    job_id: &str,
    submission: Submission,
  ) -> Result<AssessmentResponse> {
    submission.validate()?;
    self
      .call(Route::SubmitResponse, |db| {
        assessments::submit(db, job_id, submission, &self.actor, Utc::now())
      })
      .await
  }

  // ==========================================================================
  // People
  // ==========================================================================

  pub async fn list_users(&self) -> Result<Vec<User>> {
    self.call(Route::ListUsers, users::list).await
  }

  pub async fn create_hr_manager(&self, input: NewHrManager) -> Result<HrManager> {
    input.validate()?;
    self
      .call(Route::CreateHrManager, |db| {
        users::create_hr_manager(db, input, Utc::now())
      })
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::transport::ScriptedTransport;
  use crate::db::Filter;

  fn client() -> (ApiClient, Arc<ScriptedTransport>) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let transport = Arc::new(ScriptedTransport::new());
    (ApiClient::new(db, transport.clone()), transport)
  }

  #[tokio::test]
  async fn test_validation_happens_before_transport() {
    let (api, transport) = client();
    let err = api
      .create_candidate(NewCandidate {
        name: String::new(),
        email: "not-an-email".to_string(),
        phone: None,
        job_id: "job-1".to_string(),
      })
      .await
      .unwrap_err();

    assert!(matches!(err, crate::Error::Validation(_)));
    assert!(transport.calls().is_empty());
  }

  #[tokio::test]
  async fn test_transport_failure_skips_handler() {
    let (api, transport) = client();
    transport.fail_next();

    let err = api
      .create_hr_manager(NewHrManager {
        name: "Hana".to_string(),
        email: "hana@example.com".to_string(),
        assigned_jobs: Vec::new(),
      })
      .await
      .unwrap_err();
    assert!(err.is_transient());

    let stored = api
      .database()
      .read(|s| s.count::<HrManager>(&Filter::all()))
      .unwrap();
    assert_eq!(stored, 0);
  }

  #[tokio::test]
  async fn test_stage_change_uses_client_actor() {
    let (api, _) = client();
    let api = api.with_actor(Actor::new("hr-7", "Priya"));
    let candidate = api
      .create_candidate(NewCandidate {
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        phone: None,
        job_id: "job-1".to_string(),
      })
      .await
      .unwrap();

    api
      .update_candidate(&candidate.id, &CandidatePatch::stage(crate::model::Stage::Screen))
      .await
      .unwrap();

    let timeline = api.candidate_timeline(&candidate.id).await.unwrap();
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline[1].actor_name, "Priya");
  }
}
