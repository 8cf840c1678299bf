//! API client with transparent query caching.

use std::collections::BTreeMap;
use tracing::info;

use crate::api::ApiClient;
use crate::error::Result;
use crate::model::{
  Assessment, AssessmentDraft, AssessmentResponse, Candidate, CandidatePatch, CandidateQuery,
  HrManager, Job, JobPatch, JobQuery, NewCandidate, NewHrManager, NewJob, NewNote, Page, Stage,
  Submission, TimelineEvent, User,
};
use crate::query::{CacheResult, QueryClient, QueryKey, CANDIDATE_LISTS, JOB_LISTS};

/// Wraps [`ApiClient`] with the same operations, reading through the query
/// cache and applying each mutation's cache effects on success.
#[derive(Clone)]
pub struct CachedClient {
  pub(super) api: ApiClient,
  pub(super) cache: QueryClient,
}

impl CachedClient {
  pub fn new(api: ApiClient, cache: QueryClient) -> Self {
    Self { api, cache }
  }

  pub fn api(&self) -> &ApiClient {
    &self.api
  }

  pub fn cache(&self) -> &QueryClient {
    &self.cache
  }

  // ==========================================================================
  // Queries
  // ==========================================================================

  pub async fn jobs(&self, params: &JobQuery) -> Result<CacheResult<Page<Job>>> {
    let key = QueryKey::JobList(params.clone());
    self
      .cache
      .fetch_query(&key, || self.api.list_jobs(params))
      .await
  }

  pub async fn job(&self, id: &str) -> Result<CacheResult<Job>> {
    let key = QueryKey::JobDetail(id.to_string());
    self.cache.fetch_query(&key, || self.api.get_job(id)).await
  }

  pub async fn candidates(&self, params: &CandidateQuery) -> Result<CacheResult<Page<Candidate>>> {
    let key = QueryKey::CandidateList(params.clone());
    self
      .cache
      .fetch_query(&key, || self.api.list_candidates(params))
      .await
  }

  pub async fn candidate(&self, id: &str) -> Result<CacheResult<Candidate>> {
    let key = QueryKey::CandidateDetail(id.to_string());
    self
      .cache
      .fetch_query(&key, || self.api.get_candidate(id))
      .await
  }

  pub async fn timeline(&self, candidate_id: &str) -> Result<CacheResult<Vec<TimelineEvent>>> {
    let key = QueryKey::CandidateTimeline(candidate_id.to_string());
    self
      .cache
      .fetch_query(&key, || self.api.candidate_timeline(candidate_id))
      .await
  }

  pub async fn assessment(&self, job_id: &str) -> Result<CacheResult<Assessment>> {
    let key = QueryKey::Assessment(job_id.to_string());
    self
      .cache
      .fetch_query(&key, || self.api.get_assessment(job_id))
      .await
  }

  pub async fn users(&self) -> Result<CacheResult<Vec<User>>> {
    self
      .cache
      .fetch_query(&QueryKey::Users, || self.api.list_users())
      .await
  }

  /// Not cached; counts change with every candidate write.
  pub async fn candidate_counts(&self, job_ids: &[String]) -> Result<BTreeMap<String, usize>> {
    self.api.candidate_counts(job_ids).await
  }

  // ==========================================================================
  // Job mutations
  // ==========================================================================

  pub async fn create_job(&self, input: NewJob) -> Result<Job> {
    let job = self.api.create_job(input).await?;
    self
      .cache
      .set_query_data(&QueryKey::JobDetail(job.id.clone()), &job)?;
    self.cache.invalidate_prefix(JOB_LISTS)?;
    Ok(job)
  }

  pub async fn update_job(&self, id: &str, patch: &JobPatch) -> Result<Job> {
    let job = self.api.update_job(id, patch).await?;
    self
      .cache
      .set_query_data(&QueryKey::JobDetail(job.id.clone()), &job)?;
    self.cache.invalidate_prefix(JOB_LISTS)?;
    Ok(job)
  }

  // ==========================================================================
  // Candidate mutations
  // ==========================================================================

  pub async fn create_candidate(&self, input: NewCandidate) -> Result<Candidate> {
    let candidate = self.api.create_candidate(input).await?;
    self
      .cache
      .set_query_data(&QueryKey::CandidateDetail(candidate.id.clone()), &candidate)?;
    self.cache.invalidate_prefix(CANDIDATE_LISTS)?;
    Ok(candidate)
  }

  /// Patch a candidate. On success the detail entry is overwritten in
  /// place, the timeline goes stale and every candidate list is invalidated.
  /// On failure the cache is left alone.
  pub async fn update_candidate(&self, id: &str, patch: &CandidatePatch) -> Result<Candidate> {
    let candidate = self.api.update_candidate(id, patch).await?;

    self
      .cache
      .set_query_data(&QueryKey::CandidateDetail(candidate.id.clone()), &candidate)?;
    self
      .cache
      .invalidate(&QueryKey::CandidateTimeline(candidate.id.clone()))?;
    self.cache.invalidate_prefix(CANDIDATE_LISTS)?;

    info!(id, stage = %candidate.stage, "candidate updated");
    Ok(candidate)
  }

  pub async fn move_candidate(&self, id: &str, stage: Stage) -> Result<Candidate> {
    self.update_candidate(id, &CandidatePatch::stage(stage)).await
  }

  pub async fn add_note(&self, id: &str, input: NewNote) -> Result<Candidate> {
    let candidate = self.api.add_note(id, input).await?;
    self
      .cache
      .set_query_data(&QueryKey::CandidateDetail(candidate.id.clone()), &candidate)?;
    self
      .cache
      .invalidate(&QueryKey::CandidateTimeline(candidate.id.clone()))?;
    Ok(candidate)
  }

  // ==========================================================================
  // Assessments and people
  // ==========================================================================

  pub async fn save_assessment(&self, job_id: &str, draft: AssessmentDraft) -> Result<Assessment> {
    let assessment = self.api.put_assessment(job_id, draft).await?;
    self
      .cache
      .set_query_data(&QueryKey::Assessment(job_id.to_string()), &assessment)?;
    Ok(assessment)
  }

  pub async fn submit_response(
    &self,
    job_id: &str,
    submission: Submission,
  ) -> Result<AssessmentResponse> {
    let response = self.api.submit_response(job_id, submission).await?;
    self
      .cache
      .invalidate(&QueryKey::CandidateTimeline(response.candidate_id.clone()))?;
    Ok(response)
  }

  pub async fn create_hr_manager(&self, input: NewHrManager) -> Result<HrManager> {
    self.api.create_hr_manager(input).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::ScriptedTransport;
  use crate::db::Database;
  use crate::model::TimelineAction;
  use crate::query::CacheSource;
  use std::sync::Arc;

  fn client() -> (CachedClient, Arc<ScriptedTransport>) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let transport = Arc::new(ScriptedTransport::new());
    let api = ApiClient::new(db, transport.clone());
    (CachedClient::new(api, QueryClient::new()), transport)
  }

  fn applicant() -> NewCandidate {
    NewCandidate {
      name: "Ada Lovelace".to_string(),
      email: "ada@example.com".to_string(),
      phone: None,
      job_id: "job-1".to_string(),
    }
  }

  #[tokio::test]
  async fn test_stage_change_updates_detail_and_stales_timeline() {
    let (client, _) = client();
    let candidate = client.create_candidate(applicant()).await.unwrap();
    let list_key = QueryKey::CandidateList(CandidateQuery::default());
    let timeline_key = QueryKey::CandidateTimeline(candidate.id.clone());

    client.candidates(&CandidateQuery::default()).await.unwrap();
    let timeline = client.timeline(&candidate.id).await.unwrap();
    assert_eq!(timeline.data.len(), 1);

    client.move_candidate(&candidate.id, Stage::Screen).await.unwrap();

    let cached: Candidate = client
      .cache()
      .get_query_data(&QueryKey::CandidateDetail(candidate.id.clone()))
      .unwrap()
      .unwrap();
    assert_eq!(cached.stage, Stage::Screen);
    assert!(client.cache().is_stale(&timeline_key).unwrap());
    assert!(client.cache().is_stale(&list_key).unwrap());

    let refreshed = client.timeline(&candidate.id).await.unwrap();
    assert_eq!(refreshed.source, CacheSource::Network);
    assert_eq!(refreshed.data.len(), 2);
    assert_eq!(refreshed.data[1].action, TimelineAction::StageChange);
  }

  #[tokio::test]
  async fn test_failed_stage_change_leaves_cache_alone() {
    let (client, transport) = client();
    let candidate = client.create_candidate(applicant()).await.unwrap();
    let detail_key = QueryKey::CandidateDetail(candidate.id.clone());
    let before = client.cache().get_raw(&detail_key).unwrap();

    transport.fail_next();
    let err = client
      .move_candidate(&candidate.id, Stage::Offer)
      .await
      .unwrap_err();
    assert!(err.is_transient());

    assert_eq!(client.cache().get_raw(&detail_key).unwrap(), before);
    let stored = client.api().get_candidate(&candidate.id).await.unwrap();
    assert_eq!(stored.stage, Stage::Applied);
  }

  #[tokio::test]
  async fn test_list_served_offline_after_fault() {
    let (client, transport) = client();
    client
      .create_job(NewJob {
        title: "Backend Engineer".to_string(),
        ..Default::default()
      })
      .await
      .unwrap();

    let params = JobQuery::default();
    client.jobs(&params).await.unwrap();
    client
      .cache()
      .invalidate(&QueryKey::JobList(params.clone()))
      .unwrap();

    transport.fail_next();
    let result = client.jobs(&params).await.unwrap();
    assert_eq!(result.source, CacheSource::Offline);
    assert_eq!(result.data.data.len(), 1);
  }
}
