//! Domain types for jobs, candidates, assessments and people.

mod assessment;
mod candidate;
mod job;
mod user;

pub use assessment::{
  Assessment, AssessmentDraft, AssessmentResponse, ChoiceOption, ConditionalRule, Question,
  QuestionType, QuestionValidation, ResponseStatus, Section, Submission,
};
pub use candidate::{
  Candidate, CandidatePatch, CandidateQuery, NewCandidate, NewNote, Note, Stage, TimelineAction,
  TimelineEvent,
};
pub use job::{
  slugify, statuses_grouped, Job, JobPatch, JobQuery, JobSort, JobStatus, NewJob, Salary,
};
pub use user::{Actor, HrManager, NewHrManager, User};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
  pub page: usize,
  pub page_size: usize,
  pub total: usize,
  pub total_pages: usize,
}

/// One page of a filtered list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
  pub data: Vec<T>,
  pub pagination: Pagination,
}

impl<T> Page<T> {
  /// Slice `items` to the 1-based `page`. A zero page or page size is
  /// treated as 1.
  pub fn paginate(items: Vec<T>, page: usize, page_size: usize) -> Self {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let total = items.len();
    let total_pages = total.div_ceil(page_size);

    let data = items
      .into_iter()
      .skip((page - 1) * page_size)
      .take(page_size)
      .collect();

    Self {
      data,
      pagination: Pagination {
        page,
        page_size,
        total,
        total_pages,
      },
    }
  }
}
