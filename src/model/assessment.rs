use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
  SingleChoice,
  MultiChoice,
  ShortText,
  LongText,
  Numeric,
  FileUpload,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionValidation {
  pub min: Option<f64>,
  pub max: Option<f64>,
  pub min_length: Option<usize>,
  pub max_length: Option<usize>,
}

/// Show a question only when another question has a given answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalRule {
  pub show_if_question_id: String,
  pub equals: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
  pub id: String,
  pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
  pub id: String,
  #[serde(rename = "type")]
  pub question_type: QuestionType,
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub options: Vec<ChoiceOption>,
  #[serde(default)]
  pub required: bool,
  #[serde(default)]
  pub validation: QuestionValidation,
  pub conditional: Option<ConditionalRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub questions: Vec<Question>,
}

/// The assessment attached to a job. At most one exists per job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
  pub id: String,
  pub job_id: String,
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub sections: Vec<Section>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Assessment {
  pub fn questions(&self) -> impl Iterator<Item = &Question> {
    self.sections.iter().flat_map(|s| s.questions.iter())
  }
}

/// Body of a save; replaces the assessment content for a job
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AssessmentDraft {
  #[validate(length(min = 1, message = "Title is required"))]
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseStatus {
  NotStarted,
  InProgress,
  Completed,
  Reviewed,
}

/// A candidate's answers to an assessment. One per (assessment, candidate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResponse {
  pub id: String,
  pub assessment_id: String,
  pub candidate_id: String,
  pub status: ResponseStatus,
  /// Question id to answer
  #[serde(default)]
  pub responses: BTreeMap<String, Value>,
  pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Submission {
  #[validate(length(min = 1, message = "Candidate is required"))]
  pub candidate_id: String,
  #[serde(default)]
  pub responses: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_question_type_wire_names() {
    let json = serde_json::to_string(&QuestionType::SingleChoice).unwrap();
    assert_eq!(json, "\"single-choice\"");

    let question: Question = serde_json::from_value(serde_json::json!({
      "id": "q1",
      "type": "numeric",
      "title": "Years of experience",
      "required": true,
      "validation": { "min": 0.0, "max": 50.0, "min_length": null, "max_length": null },
      "conditional": null
    }))
    .unwrap();
    assert_eq!(question.question_type, QuestionType::Numeric);
    assert!(question.options.is_empty());
    assert_eq!(question.validation.max, Some(50.0));
  }
}
