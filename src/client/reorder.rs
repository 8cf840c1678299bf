//! Optimistic job reordering with rollback.
//!
//! The lifecycle mirrors a TanStack mutation: `on_mutate` cancels in-flight
//! fetches for the list view, snapshots it and writes the reordered list;
//! `on_error` puts the snapshot back; `on_settled` invalidates the view
//! whatever the outcome.

use serde_json::Value;
use tracing::{info, warn};

use super::cached_client::CachedClient;
use crate::error::{Error, Result};
use crate::model::{statuses_grouped, Job, JobQuery, Page};
use crate::ordering;
use crate::query::{QueryKey, JOB_LISTS};

/// Move one job within a cached list view. Positions are indices into that
/// view as the user saw it; the server rebuilds the same view to apply them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderJob {
  pub id: String,
  pub from_order: usize,
  pub to_order: usize,
  /// Filters identifying the cached list view
  pub params: JobQuery,
}

/// State captured by `on_mutate` for one reorder
#[derive(Debug, Clone)]
pub struct ReorderContext {
  pub key: QueryKey,
  /// The cached value before this mutation's optimistic write
  pub previous: Option<Value>,
  /// False when the job was not in the cached view and nothing was written
  pub applied: bool,
}

impl CachedClient {
  pub fn on_mutate_reorder(&self, mutation: &ReorderJob) -> Result<ReorderContext> {
    mutation.params.check_reorderable()?;
    let key = QueryKey::JobList(mutation.params.clone());
    self.cache.cancel_queries(&key)?;

    let mut applied = false;
    let mut crosses_statuses = false;
    let previous = self.cache.update_query_data::<Page<Job>, _>(&key, |current| {
      let mut page = current?;
      let moved = ordering::reorder(
        &page.data,
        &mutation.id,
        mutation.from_order,
        mutation.to_order,
      )?;
      if !statuses_grouped(&moved) {
        crosses_statuses = true;
        return None;
      }
      page.data = moved;
      applied = true;
      Some(page)
    })?;

    if crosses_statuses {
      return Err(Error::Validation(
        "cannot move a job among jobs with another status".to_string(),
      ));
    }

    Ok(ReorderContext {
      key,
      previous,
      applied,
    })
  }

  /// Restore this mutation's own snapshot. Later writes to the key are
  /// overwritten.
  pub fn on_reorder_error(&self, context: &ReorderContext) -> Result<()> {
    if context.applied {
      self.cache.set_raw(&context.key, context.previous.clone())?;
      warn!(key = %context.key.description(), "rolled back optimistic reorder");
    }
    Ok(())
  }

  pub fn on_reorder_settled(&self, context: &ReorderContext) -> Result<()> {
    self.cache.invalidate(&context.key)?;
    self.cache.invalidate_prefix(JOB_LISTS)?;
    Ok(())
  }

  /// Reorder a job optimistically. The returned error is the server's; the
  /// cache has already been rolled back when it is returned.
  pub async fn reorder_job(&self, mutation: ReorderJob) -> Result<()> {
    let context = self.on_mutate_reorder(&mutation)?;

    let result = self
      .api
      .reorder_job(
        &mutation.id,
        &mutation.params,
        mutation.from_order,
        mutation.to_order,
      )
      .await;

    if result.is_err() {
      self.on_reorder_error(&context)?;
    }
    self.on_reorder_settled(&context)?;

    if result.is_ok() {
      info!(
        id = %mutation.id,
        from = mutation.from_order,
        to = mutation.to_order,
        "reorder confirmed"
      );
    }
    result
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::{ApiClient, Outcome, ScriptedTransport};
  use crate::db::Database;
  use crate::model::{JobPatch, JobStatus, NewJob};
  use crate::query::QueryClient;
  use std::sync::Arc;
  use std::time::Duration;

  async fn setup(n: usize) -> (CachedClient, Arc<ScriptedTransport>, Vec<Job>) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let transport = Arc::new(ScriptedTransport::new());
    let client = CachedClient::new(ApiClient::new(db, transport.clone()), QueryClient::new());

    let mut jobs = Vec::new();
    for i in 0..n {
      let job = client
        .api()
        .create_job(NewJob {
          title: format!("Role {}", i),
          ..Default::default()
        })
        .await
        .unwrap();
      jobs.push(job);
    }

    client.jobs(&JobQuery::default()).await.unwrap();
    (client, transport, jobs)
  }

  fn cached_page(client: &CachedClient) -> Page<Job> {
    client
      .cache()
      .get_query_data(&QueryKey::JobList(JobQuery::default()))
      .unwrap()
      .unwrap()
  }

  fn ids(page: &Page<Job>) -> Vec<String> {
    page.data.iter().map(|j| j.id.clone()).collect()
  }

  fn orders(page: &Page<Job>) -> Vec<i64> {
    page.data.iter().map(|j| j.order).collect()
  }

  fn mutation(job: &Job, from_order: usize, to_order: usize) -> ReorderJob {
    ReorderJob {
      id: job.id.clone(),
      from_order,
      to_order,
      params: JobQuery::default(),
    }
  }

  #[tokio::test]
  async fn test_optimistic_write_is_dense() {
    let (client, _, jobs) = setup(10).await;

    let context = client.on_mutate_reorder(&mutation(&jobs[4], 4, 0)).unwrap();
    assert!(context.applied);

    let page = cached_page(&client);
    assert_eq!(page.data[0].id, jobs[4].id);
    assert_eq!(page.data[1].id, jobs[0].id);
    assert_eq!(orders(&page), (0..10).collect::<Vec<i64>>());
  }

  #[tokio::test]
  async fn test_success_settles_and_server_agrees() {
    let (client, transport, jobs) = setup(10).await;
    transport.script([Outcome::Deliver]);

    client.reorder_job(mutation(&jobs[4], 4, 0)).await.unwrap();

    let key = QueryKey::JobList(JobQuery::default());
    assert!(client.cache().is_stale(&key).unwrap());
    let optimistic = cached_page(&client);

    let refetched = client.jobs(&JobQuery::default()).await.unwrap().data;
    assert_eq!(ids(&refetched), ids(&optimistic));
    assert_eq!(orders(&refetched), (0..10).collect::<Vec<i64>>());
  }

  #[tokio::test]
  async fn test_injected_fault_restores_snapshot() {
    let (client, transport, jobs) = setup(10).await;
    let key = QueryKey::JobList(JobQuery::default());
    let snapshot = client.cache().get_raw(&key).unwrap();

    transport.fail_next();
    let err = client
      .reorder_job(mutation(&jobs[4], 4, 0))
      .await
      .unwrap_err();
    assert!(err.is_transient());

    assert_eq!(client.cache().get_raw(&key).unwrap(), snapshot);
    assert!(client.cache().is_stale(&key).unwrap());

    let stored = client.api().list_jobs(&JobQuery::default()).await.unwrap();
    assert_eq!(ids(&stored), jobs.iter().map(|j| j.id.clone()).collect::<Vec<_>>());
  }

  #[tokio::test]
  async fn test_concurrent_failure_restores_only_own_snapshot() {
    let (client, transport, jobs) = setup(5).await;
    transport.script([
      Outcome::DeliverAfter(Duration::from_millis(40)),
      Outcome::FailAfter(Duration::from_millis(10)),
    ]);

    let first = mutation(&jobs[4], 4, 0);
    let second = mutation(&jobs[1], 2, 4);
    let (a, b) = tokio::join!(client.reorder_job(first), client.reorder_job(second));
    assert!(a.is_ok());
    assert!(b.unwrap_err().is_transient());

    // The second reorder snapshotted the first one's optimistic list
    let page = cached_page(&client);
    let expected = vec![
      jobs[4].id.clone(),
      jobs[0].id.clone(),
      jobs[1].id.clone(),
      jobs[2].id.clone(),
      jobs[3].id.clone(),
    ];
    assert_eq!(ids(&page), expected);
    assert_eq!(orders(&page), vec![0, 1, 2, 3, 4]);
  }

  #[tokio::test]
  async fn test_uncached_view_still_calls_server() {
    let (client, transport, jobs) = setup(3).await;
    let other_view = ReorderJob {
      params: JobQuery::default().with_page(1, 3),
      ..mutation(&jobs[2], 2, 0)
    };

    let context = client.on_mutate_reorder(&other_view).unwrap();
    assert!(!context.applied);
    assert_eq!(context.previous, None);

    client.reorder_job(other_view).await.unwrap();
    assert_eq!(transport.calls().last(), Some(&crate::api::Route::ReorderJob));

    let stored = client.api().list_jobs(&JobQuery::default()).await.unwrap();
    assert_eq!(stored.data[0].id, jobs[2].id);
    assert_eq!(client.cache().get_raw(&context.key).unwrap(), None);
  }

  #[tokio::test]
  async fn test_second_page_reorder_survives_refetch() {
    let (client, transport, jobs) = setup(12).await;
    let second = JobQuery::default().with_page(2, 10);
    client.jobs(&second).await.unwrap();
    transport.script([Outcome::Deliver]);

    client
      .reorder_job(ReorderJob {
        params: second.clone(),
        ..mutation(&jobs[11], 1, 0)
      })
      .await
      .unwrap();
    let key = QueryKey::JobList(second.clone());
    let optimistic: Page<Job> = client.cache().get_query_data(&key).unwrap().unwrap();
    assert_eq!(ids(&optimistic), vec![jobs[11].id.clone(), jobs[10].id.clone()]);

    let refetched = client.jobs(&second).await.unwrap().data;
    assert_eq!(ids(&refetched), ids(&optimistic));
  }

  #[tokio::test]
  async fn test_mixed_status_reorder_survives_refetch() {
    let (client, transport, jobs) = setup(6).await;
    for job in &jobs[3..] {
      let patch = JobPatch {
        status: Some(JobStatus::Archived),
        ..Default::default()
      };
      client.api().update_job(&job.id, &patch).await.unwrap();
    }
    let all = JobQuery::default();
    client.cache().invalidate(&QueryKey::JobList(all.clone())).unwrap();
    client.jobs(&all).await.unwrap();
    transport.script([Outcome::Deliver]);

    client.reorder_job(mutation(&jobs[2], 2, 0)).await.unwrap();
    let optimistic = cached_page(&client);
    let expected = [&jobs[2], &jobs[0], &jobs[1], &jobs[3], &jobs[4], &jobs[5]]
      .map(|j| j.id.clone())
      .to_vec();
    assert_eq!(ids(&optimistic), expected);

    let refetched = client.jobs(&all).await.unwrap().data;
    assert_eq!(ids(&refetched), ids(&optimistic));
  }

  #[tokio::test]
  async fn test_move_across_statuses_is_refused_before_writing() {
    let (client, transport, jobs) = setup(3).await;
    let patch = JobPatch {
      status: Some(JobStatus::Archived),
      ..Default::default()
    };
    client.api().update_job(&jobs[2].id, &patch).await.unwrap();
    client.cache().invalidate(&QueryKey::JobList(JobQuery::default())).unwrap();
    client.jobs(&JobQuery::default()).await.unwrap();

    let key = QueryKey::JobList(JobQuery::default());
    let snapshot = client.cache().get_raw(&key).unwrap();
    let calls = transport.calls().len();

    let err = client.reorder_job(mutation(&jobs[0], 0, 2)).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(client.cache().get_raw(&key).unwrap(), snapshot);
    assert_eq!(transport.calls().len(), calls);
  }
}
