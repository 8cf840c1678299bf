//! Table set for the local document store.
//!
//! Each table keeps the serialized record in `data` and exposes the fields
//! it is filtered or constrained on as generated columns, so indexes work
//! without duplicating state.

/// Tables in the store, one per record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
  Jobs,
  Candidates,
  CandidateTimeline,
  HrManagers,
  Assessments,
  AssessmentResponses,
  Users,
}

impl Table {
  pub const ALL: [Table; 7] = [
    Table::Jobs,
    Table::Candidates,
    Table::CandidateTimeline,
    Table::HrManagers,
    Table::Assessments,
    Table::AssessmentResponses,
    Table::Users,
  ];

  pub fn name(&self) -> &'static str {
    match self {
      Self::Jobs => "jobs",
      Self::Candidates => "candidates",
      Self::CandidateTimeline => "candidate_timeline",
      Self::HrManagers => "hr_managers",
      Self::Assessments => "assessments",
      Self::AssessmentResponses => "assessment_responses",
      Self::Users => "users",
    }
  }

  /// Columns a filter may reference, besides `id`.
  pub fn indexes(&self) -> &'static [&'static str] {
    match self {
      Self::Jobs => &["title", "slug", "status", "sort_order"],
      Self::Candidates => &["email", "stage", "job_id"],
      Self::CandidateTimeline => &["candidate_id", "job_id"],
      Self::HrManagers => &["email"],
      Self::Assessments => &["job_id"],
      Self::AssessmentResponses => &["assessment_id", "candidate_id"],
      Self::Users => &["email"],
    }
  }

  pub fn has_column(&self, column: &str) -> bool {
    column == "id" || self.indexes().contains(&column)
  }
}

pub const MIGRATION_V1_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    id TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    title TEXT GENERATED ALWAYS AS (json_extract(data, '$.title')) VIRTUAL,
    slug TEXT GENERATED ALWAYS AS (json_extract(data, '$.slug')) VIRTUAL,
    status TEXT GENERATED ALWAYS AS (json_extract(data, '$.status')) VIRTUAL,
    sort_order INTEGER GENERATED ALWAYS AS (json_extract(data, '$.order')) VIRTUAL
);

CREATE INDEX IF NOT EXISTS idx_jobs_status_order ON jobs(status, sort_order);
CREATE INDEX IF NOT EXISTS idx_jobs_slug ON jobs(slug);

CREATE TABLE IF NOT EXISTS candidates (
    id TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    email TEXT GENERATED ALWAYS AS (json_extract(data, '$.email')) VIRTUAL,
    stage TEXT GENERATED ALWAYS AS (json_extract(data, '$.stage')) VIRTUAL,
    job_id TEXT GENERATED ALWAYS AS (json_extract(data, '$.job_id')) VIRTUAL
);

CREATE INDEX IF NOT EXISTS idx_candidates_stage ON candidates(stage);
CREATE INDEX IF NOT EXISTS idx_candidates_job ON candidates(job_id);
CREATE INDEX IF NOT EXISTS idx_candidates_email ON candidates(email);

-- Append-only; rowid preserves insertion order for equal timestamps
CREATE TABLE IF NOT EXISTS candidate_timeline (
    id TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    candidate_id TEXT GENERATED ALWAYS AS (json_extract(data, '$.candidate_id')) VIRTUAL,
    job_id TEXT GENERATED ALWAYS AS (json_extract(data, '$.job_id')) VIRTUAL
);

CREATE INDEX IF NOT EXISTS idx_timeline_candidate ON candidate_timeline(candidate_id);
CREATE INDEX IF NOT EXISTS idx_timeline_job ON candidate_timeline(job_id);

CREATE TABLE IF NOT EXISTS hr_managers (
    id TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    email TEXT GENERATED ALWAYS AS (json_extract(data, '$.email')) VIRTUAL
);

CREATE INDEX IF NOT EXISTS idx_hr_managers_email ON hr_managers(email);

CREATE TABLE IF NOT EXISTS assessments (
    id TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    job_id TEXT GENERATED ALWAYS AS (json_extract(data, '$.job_id')) VIRTUAL
);

CREATE INDEX IF NOT EXISTS idx_assessments_job ON assessments(job_id);

CREATE TABLE IF NOT EXISTS assessment_responses (
    id TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    assessment_id TEXT GENERATED ALWAYS AS (json_extract(data, '$.assessment_id')) VIRTUAL,
    candidate_id TEXT GENERATED ALWAYS AS (json_extract(data, '$.candidate_id')) VIRTUAL
);

CREATE INDEX IF NOT EXISTS idx_responses_pair
    ON assessment_responses(assessment_id, candidate_id);
CREATE INDEX IF NOT EXISTS idx_responses_candidate ON assessment_responses(candidate_id);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    email TEXT GENERATED ALWAYS AS (json_extract(data, '$.email')) VIRTUAL
);
"#;
