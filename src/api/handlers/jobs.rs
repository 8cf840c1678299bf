use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::{Database, Filter, Store};
use crate::error::{Error, Result};
use crate::model::{
  slugify, statuses_grouped, Job, JobPatch, JobQuery, JobSort, JobStatus, NewJob, Page,
};
use crate::ordering;

pub fn list(db: &Database, query: &JobQuery) -> Result<Page<Job>> {
  db.read(|s| view(s, query))
}

/// The page a list view shows. In display order jobs are grouped by status,
/// each group in its partition order.
fn view(s: &Store<'_>, query: &JobQuery) -> Result<Page<Job>> {
  let filter = match query.status {
    Some(status) => Filter::all().eq("status", status.as_str().to_string()),
    None => Filter::all(),
  };

  let mut jobs: Vec<Job> = s.query(&filter.order_by("sort_order"))?;
  jobs.retain(|job| query.matches(job));

  match query.sort {
    JobSort::Order => jobs.sort_by_key(|j| (j.status, j.order)),
    JobSort::Title => jobs.sort_by_key(|j| j.title.to_lowercase()),
    JobSort::CreatedAt => jobs.sort_by_key(|j| j.created_at),
  }

  Ok(Page::paginate(jobs, query.page, query.page_size))
}

fn partition(s: &Store<'_>, status: JobStatus) -> Result<Vec<Job>> {
  s.query(
    &Filter::all()
      .eq("status", status.as_str().to_string())
      .order_by("sort_order"),
  )
}

pub fn get(db: &Database, id: &str) -> Result<Job> {
  db.read(|s| s.require(id))
}

/// New jobs go to the end of their status partition.
pub fn create(db: &Database, input: NewJob, now: DateTime<Utc>) -> Result<Job> {
  db.transaction(|s| {
    let partition = Filter::all().eq("status", input.status.as_str().to_string());
    let order = s.count::<Job>(&partition)? as i64;

    let job = Job {
      id: Uuid::new_v4().to_string(),
      slug: input.slug.unwrap_or_else(|| slugify(&input.title)),
      title: input.title,
      description: input.description,
      status: input.status,
      tags: input.tags,
      salary: input.salary,
      location: input.location,
      order,
      created_at: now,
      updated_at: now,
    };

    s.insert(&job)?;
    info!(id = %job.id, slug = %job.slug, "created job");
    Ok(job)
  })
}

/// Patch a job. Changing status moves the job to the end of the other
/// partition and closes the gap it left behind.
pub fn update(db: &Database, id: &str, patch: &JobPatch, now: DateTime<Utc>) -> Result<Job> {
  db.transaction(|s| {
    let current: Job = s.require(id)?;
    let mut changes = serde_json::to_value(patch)?;
    changes["updated_at"] = json!(now);

    if let Some(status) = patch.status.filter(|status| *status != current.status) {
      let target = Filter::all().eq("status", status.as_str().to_string());
      changes["order"] = json!(s.count::<Job>(&target)?);

      let mut left = partition(s, current.status)?;
      left.retain(|job| job.id != current.id);
      ordering::relabel(&mut left);
      for job in &left {
        s.update::<Job, _>(&job.id, &json!({ "order": job.order }))?;
      }
    }

    s.update(id, &changes)
  })
}

/// Move a job within a list view and persist the move to its status
/// partition, all in one transaction.
///
/// `from_order` and `to_order` are positions in the page `query` describes.
/// The page is rebuilt and reordered the way the client did it, then the job
/// is placed next to its new same-status neighbour in the partition, so the
/// page reads the same once refetched. Jobs outside the page keep their
/// relative order.
pub fn reorder(
  db: &Database,
  id: &str,
  query: &JobQuery,
  from_order: usize,
  to_order: usize,
) -> Result<()> {
  query.check_reorderable()?;

  db.transaction(|s| {
    let job: Job = s.require(id)?;
    let page = view(s, query)?.data;

    let Some(moved) = ordering::reorder(&page, id, from_order, to_order) else {
      debug!(id, "job is not in the list view, nothing to reorder");
      return Ok(());
    };
    if !statuses_grouped(&moved) {
      return Err(Error::Validation(format!(
        "cannot move a {} job among jobs with another status",
        job.status.as_str()
      )));
    }

    let Some(position) = moved.iter().position(|j| j.id == id) else {
      return Ok(());
    };
    let same_status = |j: &&Job| j.status == job.status;
    let next = moved.get(position + 1).filter(same_status);
    let prev = position
      .checked_sub(1)
      .and_then(|p| moved.get(p))
      .filter(same_status);

    let mut jobs = partition(s, job.status)?;
    let before: Vec<(String, i64)> = jobs.iter().map(|j| (j.id.clone(), j.order)).collect();

    let Some(current) = jobs.iter().position(|j| j.id == id) else {
      return Ok(());
    };
    let target = jobs.remove(current);
    let index = match (next, prev) {
      (Some(anchor), _) => jobs.iter().position(|j| j.id == anchor.id),
      (None, Some(anchor)) => jobs.iter().position(|j| j.id == anchor.id).map(|i| i + 1),
      // Only job of its status on the page
      (None, None) => Some(current),
    };
    jobs.insert(index.unwrap_or(current).min(jobs.len()), target);
    ordering::relabel(&mut jobs);

    for ((before_id, before_order), after) in before.iter().zip(jobs.iter()) {
      // Only rewrite rows whose position actually changed
      if *before_id != after.id || *before_order != after.order {
        s.update::<Job, _>(&after.id, &json!({ "order": after.order }))?;
      }
    }

    info!(id, from_order, to_order, "reordered job");
    Ok(())
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::JobStatus;

  fn new_job(title: &str, status: JobStatus) -> NewJob {
    NewJob {
      title: title.to_string(),
      status,
      tags: vec!["Rust".to_string()],
      ..Default::default()
    }
  }

  fn seed(db: &Database, n: usize) -> Vec<Job> {
    (0..n)
      .map(|i| create(db, new_job(&format!("Job {}", i), JobStatus::Active), Utc::now()).unwrap())
      .collect()
  }

  fn titles(page: &Page<Job>) -> Vec<String> {
    page.data.iter().map(|j| j.title.clone()).collect()
  }

  #[test]
  fn test_create_appends_to_partition() {
    let db = Database::open_in_memory().unwrap();
    let jobs = seed(&db, 3);
    let archived = create(&db, new_job("Old", JobStatus::Archived), Utc::now()).unwrap();

    assert_eq!(jobs.iter().map(|j| j.order).collect::<Vec<_>>(), vec![0, 1, 2]);
    assert_eq!(archived.order, 0);
    assert_eq!(jobs[1].slug, "job-1");
  }

  #[test]
  fn test_duplicate_slug_is_conflict() {
    let db = Database::open_in_memory().unwrap();
    create(&db, new_job("Data Engineer", JobStatus::Active), Utc::now()).unwrap();
    let err = create(&db, new_job("Data  Engineer", JobStatus::Active), Utc::now()).unwrap_err();
    assert!(err.is_conflict());
  }

  #[test]
  fn test_list_filters_and_paginates() {
    let db = Database::open_in_memory().unwrap();
    seed(&db, 12);
    create(&db, new_job("Archived role", JobStatus::Archived), Utc::now()).unwrap();

    let page = list(&db, &JobQuery::default().with_status(JobStatus::Active)).unwrap();
    assert_eq!(page.data.len(), 10);
    assert_eq!(page.pagination.total, 12);
    assert_eq!(page.pagination.total_pages, 2);

    let found = list(&db, &JobQuery::default().with_search("archived")).unwrap();
    assert_eq!(titles(&found), vec!["Archived role"]);
  }

  #[test]
  fn test_update_patches_fields() {
    let db = Database::open_in_memory().unwrap();
    let job = seed(&db, 1).remove(0);
    let patch = JobPatch {
      title: Some("Staff Engineer".to_string()),
      ..Default::default()
    };

    let later = job.updated_at + chrono::Duration::seconds(5);
    let updated = update(&db, &job.id, &patch, later).unwrap();
    assert_eq!(updated.title, "Staff Engineer");
    assert_eq!(updated.tags, job.tags);
    assert_eq!(updated.updated_at, later);

    assert!(update(&db, "missing", &patch, later).unwrap_err().is_not_found());
  }

  #[test]
  fn test_reorder_keeps_partition_dense() {
    let db = Database::open_in_memory().unwrap();
    let jobs = seed(&db, 10);

    let active = JobQuery::default().with_status(JobStatus::Active);
    reorder(&db, &jobs[4].id, &active, 4, 0).unwrap();

    let page = list(&db, &active).unwrap();
    assert_eq!(page.data[0].id, jobs[4].id);
    assert_eq!(page.data[1].id, jobs[0].id);
    assert_eq!(
      page.data.iter().map(|j| j.order).collect::<Vec<_>>(),
      (0..10).collect::<Vec<i64>>()
    );
  }

  #[test]
  fn test_status_change_moves_between_partitions() {
    let db = Database::open_in_memory().unwrap();
    let jobs = seed(&db, 3);
    create(&db, new_job("Old", JobStatus::Archived), Utc::now()).unwrap();

    let patch = JobPatch {
      status: Some(JobStatus::Archived),
      ..Default::default()
    };
    let archived = update(&db, &jobs[0].id, &patch, Utc::now()).unwrap();
    assert_eq!(archived.order, 1);

    let active = list(&db, &JobQuery::default().with_status(JobStatus::Active)).unwrap();
    assert_eq!(
      active.data.iter().map(|j| (j.id.clone(), j.order)).collect::<Vec<_>>(),
      vec![(jobs[1].id.clone(), 0), (jobs[2].id.clone(), 1)]
    );
  }

  #[test]
  fn test_reorder_missing_job() {
    let db = Database::open_in_memory().unwrap();
    assert!(reorder(&db, "missing", &JobQuery::default(), 0, 1)
      .unwrap_err()
      .is_not_found());
  }

  fn ids(page: &Page<Job>) -> Vec<String> {
    page.data.iter().map(|j| j.id.clone()).collect()
  }

  /// The page as the client shows it after moving `id` optimistically
  fn moved_locally(
    db: &Database,
    query: &JobQuery,
    id: &str,
    from: usize,
    to: usize,
  ) -> Vec<String> {
    let page = list(db, query).unwrap();
    ordering::reorder(&page.data, id, from, to)
      .unwrap()
      .iter()
      .map(|j| j.id.clone())
      .collect()
  }

  #[test]
  fn test_reorder_on_second_page_stays_on_page() {
    let db = Database::open_in_memory().unwrap();
    let jobs = seed(&db, 12);
    let second = JobQuery::default().with_status(JobStatus::Active).with_page(2, 10);

    let expected = moved_locally(&db, &second, &jobs[11].id, 1, 0);
    assert_eq!(expected, vec![jobs[11].id.clone(), jobs[10].id.clone()]);

    reorder(&db, &jobs[11].id, &second, 1, 0).unwrap();
    assert_eq!(ids(&list(&db, &second).unwrap()), expected);

    let first = list(&db, &JobQuery::default().with_status(JobStatus::Active)).unwrap();
    assert_eq!(ids(&first), jobs[..10].iter().map(|j| j.id.clone()).collect::<Vec<_>>());
  }

  #[test]
  fn test_reorder_in_mixed_status_view() {
    let db = Database::open_in_memory().unwrap();
    let mut jobs = Vec::new();
    for (i, status) in [
      JobStatus::Active,
      JobStatus::Archived,
      JobStatus::Active,
      JobStatus::Archived,
      JobStatus::Active,
      JobStatus::Archived,
    ]
    .into_iter()
    .enumerate()
    {
      jobs.push(create(&db, new_job(&format!("R{}", i), status), Utc::now()).unwrap());
    }
    let all = JobQuery::default();

    // Active jobs come first, each group in partition order
    let page = list(&db, &all).unwrap();
    let order = [0, 2, 4, 1, 3, 5].map(|i| jobs[i].id.clone()).to_vec();
    assert_eq!(ids(&page), order);

    let expected = moved_locally(&db, &all, &jobs[4].id, 2, 0);
    reorder(&db, &jobs[4].id, &all, 2, 0).unwrap();
    assert_eq!(ids(&list(&db, &all).unwrap()), expected);

    let expected = moved_locally(&db, &all, &jobs[1].id, 3, 5);
    reorder(&db, &jobs[1].id, &all, 3, 5).unwrap();
    assert_eq!(ids(&list(&db, &all).unwrap()), expected);

    let archived = list(&db, &JobQuery::default().with_status(JobStatus::Archived)).unwrap();
    assert_eq!(
      archived.data.iter().map(|j| j.order).collect::<Vec<_>>(),
      vec![0, 1, 2]
    );
  }

  #[test]
  fn test_reorder_in_filtered_view_keeps_hidden_jobs() {
    let db = Database::open_in_memory().unwrap();
    let jobs = seed(&db, 12);
    // "Job 1" matches Job 1, Job 10 and Job 11
    let search = JobQuery::default().with_search("Job 1");

    let expected = moved_locally(&db, &search, &jobs[11].id, 2, 0);
    reorder(&db, &jobs[11].id, &search, 2, 0).unwrap();
    assert_eq!(ids(&list(&db, &search).unwrap()), expected);

    let everything = list(&db, &JobQuery::default().with_page(1, 20)).unwrap();
    let mut order: Vec<String> = jobs.iter().map(|j| j.id.clone()).collect();
    let moved = order.remove(11);
    order.insert(1, moved);
    assert_eq!(ids(&everything), order);
  }

  #[test]
  fn test_reorder_across_statuses_is_rejected() {
    let db = Database::open_in_memory().unwrap();
    let active = seed(&db, 2);
    create(&db, new_job("Old", JobStatus::Archived), Utc::now()).unwrap();

    let err = reorder(&db, &active[0].id, &JobQuery::default(), 0, 2).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let by_title = JobQuery {
      sort: JobSort::Title,
      ..Default::default()
    };
    assert!(matches!(
      reorder(&db, &active[0].id, &by_title, 0, 1),
      Err(Error::Validation(_))
    ));

    let page = list(&db, &JobQuery::default()).unwrap();
    assert_eq!(page.data[0].id, active[0].id);
    assert_eq!(page.data[0].order, 0);
  }
}
