use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Position in the hiring funnel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
  Applied,
  Screen,
  Tech,
  Offer,
  Hired,
  Rejected,
}

impl Stage {
  /// Funnel order
  pub const ALL: [Stage; 6] = [
    Stage::Applied,
    Stage::Screen,
    Stage::Tech,
    Stage::Offer,
    Stage::Hired,
    Stage::Rejected,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Applied => "applied",
      Self::Screen => "screen",
      Self::Tech => "tech",
      Self::Offer => "offer",
      Self::Hired => "hired",
      Self::Rejected => "rejected",
    }
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Stage {
  type Err = crate::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim().to_lowercase();
    Stage::ALL
      .into_iter()
      .find(|stage| stage.as_str() == wanted)
      .ok_or_else(|| {
        crate::Error::Validation(format!(
          "unknown stage '{}' (expected one of applied, screen, tech, offer, hired, rejected)",
          s
        ))
      })
  }
}

/// A note left on a candidate by a recruiter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
  pub id: String,
  pub content: String,
  pub author_id: String,
  pub author_name: String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
  pub id: String,
  pub name: String,
  pub email: String,
  pub phone: Option<String>,
  pub stage: Stage,
  pub job_id: String,
  #[serde(default)]
  pub notes: Vec<Note>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Input for creating a candidate. New candidates always start in `applied`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewCandidate {
  #[validate(length(min = 1, message = "Name is required"))]
  pub name: String,
  #[validate(email(message = "Email is not valid"))]
  pub email: String,
  pub phone: Option<String>,
  #[validate(length(min = 1, message = "Job is required"))]
  pub job_id: String,
}

/// Partial update for a candidate
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CandidatePatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  #[validate(length(min = 1, message = "Name cannot be empty"))]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  #[validate(email(message = "Email is not valid"))]
  pub email: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub stage: Option<Stage>,
}

impl CandidatePatch {
  pub fn stage(stage: Stage) -> Self {
    Self {
      stage: Some(stage),
      ..Default::default()
    }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewNote {
  #[validate(length(min = 1, max = 5000, message = "Note must be between 1 and 5000 characters"))]
  pub content: String,
}

/// Filter parameters for a candidate list view
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateQuery {
  pub search: Option<String>,
  pub stage: Option<Stage>,
  pub job_id: Option<String>,
  pub page: usize,
  pub page_size: usize,
}

impl Default for CandidateQuery {
  fn default() -> Self {
    Self {
      search: None,
      stage: None,
      job_id: None,
      page: 1,
      page_size: 50,
    }
  }
}

impl CandidateQuery {
  pub fn with_stage(mut self, stage: Stage) -> Self {
    self.stage = Some(stage);
    self
  }

  pub fn with_job(mut self, job_id: impl Into<String>) -> Self {
    self.job_id = Some(job_id.into());
    self
  }

  /// Case-insensitive match on name or email
  pub fn matches(&self, candidate: &Candidate) -> bool {
    match self.search.as_deref().map(str::trim) {
      None | Some("") => true,
      Some(term) => {
        let term = term.to_lowercase();
        candidate.name.to_lowercase().contains(&term)
          || candidate.email.to_lowercase().contains(&term)
      }
    }
  }
}

/// Kind of lifecycle event recorded on a candidate's timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineAction {
  Applied,
  StageChange,
  NoteAdded,
  AssessmentSubmitted,
}

impl TimelineAction {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Applied => "applied",
      Self::StageChange => "stage_change",
      Self::NoteAdded => "note_added",
      Self::AssessmentSubmitted => "assessment_submitted",
    }
  }
}

/// Append-only record of something that happened to a candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
  pub id: String,
  pub candidate_id: String,
  pub job_id: String,
  pub action: TimelineAction,
  pub from_stage: Option<Stage>,
  pub to_stage: Option<Stage>,
  pub timestamp: DateTime<Utc>,
  pub actor_id: String,
  pub actor_name: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_stage_round_trip_names() {
    for stage in Stage::ALL {
      assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
    }
    assert_eq!(" Screen ".parse::<Stage>().unwrap(), Stage::Screen);
  }

  #[test]
  fn test_unknown_stage_is_validation_error() {
    let err = "interview".parse::<Stage>().unwrap_err();
    assert!(matches!(err, crate::Error::Validation(_)));
  }

  #[test]
  fn test_stage_serializes_lowercase() {
    let json = serde_json::to_string(&Stage::Offer).unwrap();
    assert_eq!(json, "\"offer\"");
  }

  #[test]
  fn test_new_candidate_validation() {
    let candidate = NewCandidate {
      name: "Ada".to_string(),
      email: "not-an-email".to_string(),
      phone: None,
      job_id: "job-1".to_string(),
    };
    assert!(candidate.validate().is_err());

    let candidate = NewCandidate {
      email: "ada@example.com".to_string(),
      ..candidate
    };
    assert!(candidate.validate().is_ok());
  }
}
