//! Deterministic demo data.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tracing::info;

use crate::db::{Database, Filter, Store};
use crate::error::Result;
use crate::model::{
  slugify, Assessment, AssessmentResponse, Candidate, ChoiceOption, ConditionalRule, HrManager,
  Job, JobStatus, Question, QuestionType, QuestionValidation, Salary, Section, Stage,
  TimelineAction, TimelineEvent, User,
};
use crate::ordering;

const JOB_COUNT: usize = 25;
const CANDIDATE_COUNT: usize = 1000;
const ASSESSMENT_COUNT: usize = 3;
const USER_COUNT: usize = 10;

const TITLES: &[&str] = &[
  "Backend Engineer",
  "Frontend Engineer",
  "Platform Engineer",
  "Data Engineer",
  "Site Reliability Engineer",
  "Product Designer",
  "Engineering Manager",
  "QA Analyst",
  "Security Engineer",
  "Mobile Developer",
  "Solutions Architect",
  "Technical Writer",
];
const LEVELS: &[&str] = &["Junior", "Mid-level", "Senior", "Lead", "Staff"];
const TAGS: &[&str] = &[
  "JavaScript",
  "React",
  "Node.js",
  "Python",
  "Java",
  "PHP",
  "Angular",
  "Vue.js",
  "TypeScript",
  "Go",
];
const CITIES: &[&str] = &[
  "Berlin", "Lisbon", "Toronto", "Austin", "Bangalore", "Nairobi", "Remote",
];
const FIRST_NAMES: &[&str] = &[
  "Ada", "Brian", "Chen", "Dara", "Elif", "Farah", "Gus", "Hana", "Ivan", "Jia", "Kofi", "Lena",
  "Mateo", "Nia", "Omar", "Priya", "Quinn", "Rosa", "Sven", "Tariq",
];
const LAST_NAMES: &[&str] = &[
  "Almeida", "Becker", "Chowdhury", "Dubois", "Eriksen", "Fischer", "Garcia", "Haddad", "Ito",
  "Jensen", "Kowalski", "Lindqvist", "Mensah", "Novak", "Okafor", "Petrov",
];

/// Everything written by one seeding run
#[derive(Debug, Clone)]
pub struct SeedData {
  pub jobs: Vec<Job>,
  pub candidates: Vec<Candidate>,
  pub timeline: Vec<TimelineEvent>,
  pub assessments: Vec<Assessment>,
  pub users: Vec<User>,
}

struct Generator {
  rng: StdRng,
  now: DateTime<Utc>,
}

impl Generator {
  fn id(&mut self) -> String {
    uuid::Builder::from_random_bytes(self.rng.gen())
      .into_uuid()
      .to_string()
  }

  fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
    items.choose(&mut self.rng).copied().unwrap_or_default()
  }

  /// A moment within the last year
  fn past(&mut self) -> DateTime<Utc> {
    self.now - Duration::minutes(self.rng.gen_range(60..365 * 24 * 60))
  }

  fn name(&mut self) -> String {
    format!("{} {}", self.pick(FIRST_NAMES), self.pick(LAST_NAMES))
  }

  fn email(&self, name: &str, n: usize) -> String {
    format!("{}.{}@example.com", slugify(name).replace('-', "."), n)
  }

  fn users(&mut self) -> Vec<User> {
    (0..USER_COUNT)
      .map(|n| {
        let name = self.name();
        User {
          id: self.id(),
          email: self.email(&name, n),
          name,
          avatar_url: None,
        }
      })
      .collect()
  }

  fn jobs(&mut self) -> Vec<Job> {
    let mut jobs: Vec<Job> = (0..JOB_COUNT)
      .map(|n| {
        let title = format!("{} {}", self.pick(LEVELS), self.pick(TITLES));
        let created_at = self.past();
        let tag_count = self.rng.gen_range(2..=5);
        let tags = TAGS
          .choose_multiple(&mut self.rng, tag_count)
          .map(|t| t.to_string())
          .collect();
        let status = if self.rng.gen_bool(0.7) {
          JobStatus::Active
        } else {
          JobStatus::Archived
        };

        Job {
          id: self.id(),
          slug: format!("{}-{}", slugify(&title), n),
          description: format!("We are hiring a {} to join the team.", title.to_lowercase()),
          title,
          status,
          tags,
          salary: Some(Salary {
            min: self.rng.gen_range(4..=12) * 1000,
            max: self.rng.gen_range(15..=25) * 1000,
            currency: "$".to_string(),
            period: "month".to_string(),
          }),
          location: Some(self.pick(CITIES).to_string()),
          order: 0,
          created_at,
          updated_at: created_at,
        }
      })
      .collect();

    // Orders are dense within each status partition
    for status in [JobStatus::Active, JobStatus::Archived] {
      let partition = jobs.iter_mut().filter(|j| j.status == status);
      for (index, job) in partition.enumerate() {
        job.order = index as i64;
      }
    }
    jobs
  }

  fn candidates(&mut self, jobs: &[Job], users: &[User]) -> (Vec<Candidate>, Vec<TimelineEvent>) {
    let mut candidates = Vec::with_capacity(CANDIDATE_COUNT);
    let mut timeline = Vec::new();

    for n in 0..CANDIDATE_COUNT {
      let name = self.name();
      let created_at = self.past();
      let job = &jobs[self.rng.gen_range(0..jobs.len())];
      let stage = Stage::ALL[self.rng.gen_range(0..Stage::ALL.len())];

      let candidate = Candidate {
        id: self.id(),
        email: self.email(&name, n),
        name,
        phone: Some(format!("+1-555-{:04}", self.rng.gen_range(0..10_000))),
        stage,
        job_id: job.id.clone(),
        notes: Vec::new(),
        created_at,
        updated_at: created_at,
      };

      // Applied, optionally through one intermediate stage, then the current stage
      let mut at = created_at;
      let applied = TimelineAction::Applied;
      timeline.push(self.event(&candidate, users, applied, None, Stage::Applied, at));

      let change = TimelineAction::StageChange;
      let mut from = Stage::Applied;
      if stage != Stage::Applied {
        if self.rng.gen_bool(0.5) {
          let middle = Stage::ALL[self.rng.gen_range(1..Stage::ALL.len())];
          if middle != stage {
            at += Duration::hours(self.rng.gen_range(1..72));
            timeline.push(self.event(&candidate, users, change, Some(from), middle, at));
            from = middle;
          }
        }
        at += Duration::hours(self.rng.gen_range(1..72));
        timeline.push(self.event(&candidate, users, change, Some(from), stage, at));
      }

      candidates.push(candidate);
    }

    (candidates, timeline)
  }

  fn event(
    &mut self,
    candidate: &Candidate,
    users: &[User],
    action: TimelineAction,
    from: Option<Stage>,
    to: Stage,
    at: DateTime<Utc>,
  ) -> TimelineEvent {
    let actor = &users[self.rng.gen_range(0..users.len())];
    TimelineEvent {
      id: self.id(),
      candidate_id: candidate.id.clone(),
      job_id: candidate.job_id.clone(),
      action,
      from_stage: from,
      to_stage: Some(to),
      timestamp: at,
      actor_id: actor.id.clone(),
      actor_name: actor.name.clone(),
    }
  }

  fn questions(&mut self, section: usize) -> Vec<Question> {
    let question = |id: String, question_type, title: &str, options: &[&str], required| Question {
      id,
      question_type,
      title: title.to_string(),
      description: String::new(),
      options: options
        .iter()
        .enumerate()
        .map(|(i, text)| ChoiceOption {
          id: format!("o{}", i + 1),
          text: text.to_string(),
        })
        .collect(),
      required,
      validation: QuestionValidation::default(),
      conditional: None,
    };

    if section == 0 {
      let experience = self.id();
      let mut numeric = question(
        self.id(),
        QuestionType::Numeric,
        "Expected salary range (in thousands)",
        &[],
        false,
      );
      numeric.validation.min = Some(0.0);
      numeric.validation.max = Some(500.0);

      let mut followup = question(
        self.id(),
        QuestionType::LongText,
        "Describe the most senior project you led",
        &[],
        false,
      );
      followup.validation.max_length = Some(1000);
      followup.conditional = Some(ConditionalRule {
        show_if_question_id: experience.clone(),
        equals: json!("o4"),
      });

      vec![
        question(
          experience,
          QuestionType::SingleChoice,
          "How many years of professional experience do you have?",
          &["0-1 years", "1-3 years", "3-5 years", "5+ years"],
          true,
        ),
        followup,
        question(
          self.id(),
          QuestionType::ShortText,
          "What is your current role?",
          &[],
          true,
        ),
        numeric,
        question(
          self.id(),
          QuestionType::FileUpload,
          "Upload your resume",
          &[],
          true,
        ),
      ]
    } else {
      vec![
        question(
          self.id(),
          QuestionType::MultiChoice,
          "Which of the following technologies have you worked with?",
          TAGS,
          true,
        ),
        question(
          self.id(),
          QuestionType::LongText,
          "Describe a challenging project you worked on",
          &[],
          true,
        ),
        question(
          self.id(),
          QuestionType::SingleChoice,
          "How do you prefer to review code?",
          &["Pairing", "Pull requests", "Both"],
          false,
        ),
        question(
          self.id(),
          QuestionType::ShortText,
          "Which language do you reach for first?",
          &[],
          false,
        ),
        question(
          self.id(),
          QuestionType::Numeric,
          "How many people have you mentored?",
          &[],
          false,
        ),
      ]
    }
  }

  fn assessments(&mut self, jobs: &[Job]) -> Vec<Assessment> {
    jobs
      .iter()
      .take(ASSESSMENT_COUNT)
      .map(|job| {
        let created_at = self.past();
        Assessment {
          id: self.id(),
          job_id: job.id.clone(),
          title: format!("{} Assessment", job.title),
          description: format!("Technical assessment for the {} position", job.title),
          sections: vec![
            Section {
              id: self.id(),
              title: "Experience & Background".to_string(),
              description: "Questions about your professional experience".to_string(),
              questions: self.questions(0),
            },
            Section {
              id: self.id(),
              title: "Technical Skills".to_string(),
              description: "Technical questions related to the role".to_string(),
              questions: self.questions(1),
            },
          ],
          created_at,
          updated_at: created_at,
        }
      })
      .collect()
  }
}

/// Build the demo data set. The same seed always yields the same data
/// relative to `now`.
pub fn generate(seed: u64, now: DateTime<Utc>) -> SeedData {
  let mut g = Generator {
    rng: StdRng::seed_from_u64(seed),
    now,
  };

  let users = g.users();
  let jobs = g.jobs();
  let (candidates, timeline) = g.candidates(&jobs, &users);
  let assessments = g.assessments(&jobs);

  SeedData {
    jobs,
    candidates,
    timeline,
    assessments,
    users,
  }
}

fn clear_all(s: &Store<'_>) -> Result<()> {
  s.clear::<AssessmentResponse>()?;
  s.clear::<Assessment>()?;
  s.clear::<TimelineEvent>()?;
  s.clear::<Candidate>()?;
  s.clear::<Job>()?;
  s.clear::<HrManager>()?;
  s.clear::<User>()?;
  Ok(())
}

/// Replace every table's contents with `data` in one transaction.
pub fn seed(db: &Database, data: &SeedData) -> Result<()> {
  db.transaction(|s| {
    clear_all(s)?;
    s.bulk_insert(&data.users)?;
    s.bulk_insert(&data.jobs)?;
    s.bulk_insert(&data.candidates)?;
    s.bulk_insert(&data.timeline)?;
    s.bulk_insert(&data.assessments)?;
    Ok(())
  })?;

  info!(
    jobs = data.jobs.len(),
    candidates = data.candidates.len(),
    events = data.timeline.len(),
    assessments = data.assessments.len(),
    users = data.users.len(),
    "seeded database"
  );
  Ok(())
}

/// Seed only when the store has no jobs yet. Returns true if it seeded.
pub fn ensure_seeded(db: &Database, seed_value: u64) -> Result<bool> {
  if db.read(|s| s.count::<Job>(&Filter::all()))? > 0 {
    return Ok(false);
  }
  seed(db, &generate(seed_value, Utc::now()))?;
  Ok(true)
}

/// Check the partition invariant after seeding or a batch of writes.
pub fn orders_are_dense(jobs: &[Job]) -> bool {
  [JobStatus::Active, JobStatus::Archived].iter().all(|status| {
    let mut partition: Vec<Job> = jobs.iter().filter(|j| j.status == *status).cloned().collect();
    partition.sort_by_key(|j| j.order);
    let before: Vec<i64> = partition.iter().map(|j| j.order).collect();
    ordering::relabel(&mut partition);
    before == partition.iter().map(|j| j.order).collect::<Vec<_>>()
  })
}
