use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

use crate::db::{Database, Filter, Store};
use crate::error::Result;
use crate::model::{
  Actor, Candidate, CandidatePatch, CandidateQuery, NewCandidate, NewNote, Note, Page, Stage,
  TimelineAction, TimelineEvent,
};

/// Newest applications first.
pub fn list(db: &Database, query: &CandidateQuery) -> Result<Page<Candidate>> {
  let mut filter = Filter::all();
  if let Some(stage) = query.stage {
    filter = filter.eq("stage", stage.as_str().to_string());
  }
  if let Some(job_id) = &query.job_id {
    filter = filter.eq("job_id", job_id.clone());
  }

  let mut candidates: Vec<Candidate> = db.read(|s| s.query(&filter))?;
  candidates.retain(|c| query.matches(c));
  candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at));

  Ok(Page::paginate(candidates, query.page, query.page_size))
}

pub fn get(db: &Database, id: &str) -> Result<Candidate> {
  db.read(|s| s.require(id))
}

/// Append one timeline event. Events are never updated afterwards.
pub(crate) fn record_event(
  s: &Store<'_>,
  candidate: &Candidate,
  action: TimelineAction,
  from_stage: Option<Stage>,
  to_stage: Option<Stage>,
  actor: &Actor,
  now: DateTime<Utc>,
) -> Result<TimelineEvent> {
  let event = TimelineEvent {
    id: Uuid::new_v4().to_string(),
    candidate_id: candidate.id.clone(),
    job_id: candidate.job_id.clone(),
    action,
    from_stage,
    to_stage,
    timestamp: now,
    actor_id: actor.id.clone(),
    actor_name: actor.name.clone(),
  };
  s.insert(&event)?;
  Ok(event)
}

/// Create a candidate in `applied` together with its `applied` event.
pub fn create(db: &Database, input: NewCandidate, now: DateTime<Utc>) -> Result<Candidate> {
  db.transaction(|s| {
    let candidate = Candidate {
      id: Uuid::new_v4().to_string(),
      name: input.name,
      email: input.email,
      phone: input.phone,
      stage: Stage::Applied,
      job_id: input.job_id,
      notes: Vec::new(),
      created_at: now,
      updated_at: now,
    };

    s.insert(&candidate)?;
    record_event(
      s,
      &candidate,
      TimelineAction::Applied,
      None,
      Some(Stage::Applied),
      &Actor::system(),
      now,
    )?;

    info!(id = %candidate.id, job_id = %candidate.job_id, "created candidate");
    Ok(candidate)
  })
}

/// Patch a candidate. A stage change records exactly one `stage_change`
/// event in the same transaction as the stage write; an unchanged stage
/// records nothing.
pub fn update(
  db: &Database,
  id: &str,
  patch: &CandidatePatch,
  actor: &Actor,
  now: DateTime<Utc>,
) -> Result<Candidate> {
  db.transaction(|s| {
    let current: Candidate = s.require(id)?;

    if let Some(stage) = patch.stage.filter(|stage| *stage != current.stage) {
      record_event(
        s,
        &current,
        TimelineAction::StageChange,
        Some(current.stage),
        Some(stage),
        actor,
        now,
      )?;
      info!(id, from = %current.stage, to = %stage, "candidate stage changed");
    }

    let mut changes = serde_json::to_value(patch)?;
    changes["updated_at"] = json!(now);
    s.update(id, &changes)
  })
}

pub fn add_note(
  db: &Database,
  id: &str,
  input: NewNote,
  actor: &Actor,
  now: DateTime<Utc>,
) -> Result<Candidate> {
  db.transaction(|s| {
    let mut candidate: Candidate = s.require(id)?;
    candidate.notes.push(Note {
      id: Uuid::new_v4().to_string(),
      content: input.content,
      author_id: actor.id.clone(),
      author_name: actor.name.clone(),
      created_at: now,
    });

    record_event(s, &candidate, TimelineAction::NoteAdded, None, None, actor, now)?;
    s.update(id, &json!({ "notes": candidate.notes, "updated_at": now }))
  })
}

/// Events for a candidate by timestamp; equal timestamps keep insertion order.
pub fn timeline(db: &Database, candidate_id: &str) -> Result<Vec<TimelineEvent>> {
  let mut events: Vec<TimelineEvent> = db.read(|s| {
    s.query(&Filter::all().eq("candidate_id", candidate_id.to_string()))
  })?;
  events.sort_by_key(|e| e.timestamp);
  Ok(events)
}

pub fn counts_by_job(db: &Database, job_ids: &[String]) -> Result<BTreeMap<String, usize>> {
  db.read(|s| {
    job_ids
      .iter()
      .map(|job_id| {
        let count = s.count::<Candidate>(&Filter::all().eq("job_id", job_id.clone()))?;
        Ok((job_id.clone(), count))
      })
      .collect()
  })
}
