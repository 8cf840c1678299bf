use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::prelude::*;

use talentflow::api::{ApiClient, SimulatedTransport};
use talentflow::client::{CachedClient, ReorderJob};
use talentflow::config::Config;
use talentflow::db::Database;
use talentflow::model::{
  CandidateQuery, JobQuery, JobStatus, NewHrManager, NewNote, Stage, Submission,
};
use talentflow::query::{CacheResult, CacheSource, QueryClient};
use talentflow::seed;

#[derive(Parser, Debug)]
#[command(name = "talentflow")]
#[command(about = "Hiring pipeline tracker with a simulated, fault-injecting backend")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/talentflow/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Database file (overrides the config file)
  #[arg(long)]
  db: Option<PathBuf>,

  /// Use a throwaway in-memory database
  #[arg(long)]
  ephemeral: bool,

  /// Disable injected latency and server errors
  #[arg(long)]
  reliable: bool,

  /// Seed for the fault injector, for reproducible runs
  #[arg(long)]
  rng_seed: Option<u64>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Replace all data with generated demo data
  Seed {
    /// Generator seed (default from config)
    #[arg(long)]
    value: Option<u64>,
  },
  /// List jobs
  Jobs {
    #[arg(long)]
    status: Option<JobStatus>,
    #[arg(long)]
    search: Option<String>,
    #[arg(long, default_value_t = 1)]
    page: usize,
  },
  /// Move a job within the list of jobs with its status
  Reorder {
    id: String,
    from: usize,
    to: usize,
    #[arg(long, default_value = "active")]
    status: JobStatus,
  },
  /// List candidates
  Candidates {
    #[arg(long)]
    stage: Option<Stage>,
    #[arg(long)]
    job: Option<String>,
    #[arg(long)]
    search: Option<String>,
    #[arg(long, default_value_t = 1)]
    page: usize,
  },
  /// Move a candidate to another stage
  Move { id: String, stage: Stage },
  /// Add a note to a candidate
  Note { id: String, content: String },
  /// Show a candidate's timeline
  Timeline { id: String },
  /// Submit assessment answers for a candidate
  Submit {
    job_id: String,
    candidate_id: String,
    /// Answers as question_id=value; values are parsed as JSON when possible
    #[arg(long = "answer", value_parser = parse_answer)]
    answers: Vec<(String, serde_json::Value)>,
  },
  /// Create an HR manager
  HrManager { name: String, email: String },
  /// List users available for mentions
  Users,
}

fn parse_answer(raw: &str) -> std::result::Result<(String, serde_json::Value), String> {
  let (question, value) = raw
    .split_once('=')
    .ok_or_else(|| format!("expected question_id=value, got '{}'", raw))?;
  let value = serde_json::from_str(value).unwrap_or_else(|_| serde_json::json!(value));
  Ok((question.to_string(), value))
}

fn init_logging(log_dir: &Path) -> Result<()> {
  std::fs::create_dir_all(log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let env_filter =
    tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
  let file = tracing_appender::rolling::daily(log_dir, "talentflow.log");

  tracing_subscriber::registry()
    .with(env_filter)
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(file)
        .with_ansi(false),
    )
    .init();
  Ok(())
}

fn source_label<T>(result: &CacheResult<T>) -> &'static str {
  match result.source {
    CacheSource::Network => "",
    CacheSource::CacheFresh | CacheSource::CacheStale => " (cached)",
    CacheSource::Offline => " (offline: showing cached data)",
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let mut config = Config::load(args.config.as_deref())?;

  // Command line wins over the config file
  if let Some(db) = args.db {
    config.database.path = Some(db);
  }
  if let Some(rng_seed) = args.rng_seed {
    config.transport.rng_seed = Some(rng_seed);
  }
  if args.reliable {
    config.transport.min_latency_ms = 0;
    config.transport.max_latency_ms = 0;
    config.transport.error_rate = Some(0.0);
    config.transport.route_error_rates.clear();
  }

  let db_path = config.database_path()?;
  let log_dir = db_path
    .parent()
    .map(|dir| dir.join("logs"))
    .unwrap_or_else(|| PathBuf::from("logs"));
  init_logging(&log_dir)?;

  let db = if args.ephemeral {
    Database::open_in_memory()?
  } else {
    Database::open(&db_path)?
  };
  let db = Arc::new(db);

  if let Command::Seed { value } = &args.command {
    let value = value.unwrap_or(config.seed.value);
    let data = seed::generate(value, chrono::Utc::now());
    seed::seed(&db, &data)?;
    println!(
      "Seeded {} jobs, {} candidates, {} timeline events, {} assessments, {} users",
      data.jobs.len(),
      data.candidates.len(),
      data.timeline.len(),
      data.assessments.len(),
      data.users.len()
    );
    return Ok(());
  }

  if config.seed.auto && seed::ensure_seeded(&db, config.seed.value)? {
    println!("Empty database, seeded demo data");
  }

  let transport = Arc::new(SimulatedTransport::new(config.fault_settings()));
  let api = ApiClient::new(db, transport).with_actor(config.actor.clone());
  let client = CachedClient::new(api, QueryClient::new().with_stale_time(config.stale_time()));

  run(&client, args.command).await
}

async fn run(client: &CachedClient, command: Command) -> Result<()> {
  match command {
    Command::Seed { .. } => Ok(()),

    Command::Jobs {
      status,
      search,
      page,
    } => {
      let params = JobQuery {
        status,
        search,
        page,
        ..Default::default()
      };
      let result = client.jobs(&params).await?;
      let p = &result.data.pagination;
      println!(
        "Jobs page {}/{} ({} total){}",
        p.page,
        p.total_pages.max(1),
        p.total,
        source_label(&result)
      );
      for job in &result.data.data {
        println!(
          "{:>3}  {:<9} {:<40} {}",
          job.order,
          job.status.as_str(),
          job.title,
          job.id
        );
      }
      Ok(())
    }

    Command::Reorder {
      id,
      from,
      to,
      status,
    } => {
      let params = JobQuery::default().with_status(status).with_page(1, 100);
      client.jobs(&params).await?;

      client
        .reorder_job(ReorderJob {
          id: id.clone(),
          from_order: from,
          to_order: to,
          params,
        })
        .await
        .map_err(|e| eyre!("Reorder failed and was rolled back: {}", e))?;
      println!("Moved job {} from {} to {}", id, from, to);
      Ok(())
    }

    Command::Candidates {
      stage,
      job,
      search,
      page,
    } => {
      let params = CandidateQuery {
        stage,
        job_id: job,
        search,
        page,
        ..Default::default()
      };
      let result = client.candidates(&params).await?;
      let p = &result.data.pagination;
      println!(
        "Candidates page {}/{} ({} total){}",
        p.page,
        p.total_pages.max(1),
        p.total,
        source_label(&result)
      );
      for candidate in &result.data.data {
        println!(
          "{:<9} {:<28} {:<36} {}",
          candidate.stage, candidate.name, candidate.email, candidate.id
        );
      }
      Ok(())
    }

    Command::Move { id, stage } => {
      let candidate = client.move_candidate(&id, stage).await?;
      println!("{} is now in {}", candidate.name, candidate.stage);
      Ok(())
    }

    Command::Note { id, content } => {
      let candidate = client.add_note(&id, NewNote { content }).await?;
      println!("{} now has {} note(s)", candidate.name, candidate.notes.len());
      Ok(())
    }

    Command::Timeline { id } => {
      let result = client.timeline(&id).await?;
      println!("Timeline for {}{}", id, source_label(&result));
      for event in &result.data {
        let change = match (event.from_stage, event.to_stage) {
          (Some(from), Some(to)) => format!("{} -> {}", from, to),
          (None, Some(to)) => to.to_string(),
          _ => String::new(),
        };
        println!(
          "{}  {:<22} {:<20} by {}",
          event.timestamp.format("%Y-%m-%d %H:%M"),
          event.action.as_str(),
          change,
          event.actor_name
        );
      }
      Ok(())
    }

    Command::Submit {
      job_id,
      candidate_id,
      answers,
    } => {
      let submission = Submission {
        candidate_id,
        responses: answers.into_iter().collect::<BTreeMap<_, _>>(),
      };
      let response = client.submit_response(&job_id, submission).await?;
      println!(
        "Recorded response {} with {} answer(s)",
        response.id,
        response.responses.len()
      );
      Ok(())
    }

    Command::HrManager { name, email } => {
      let manager = client
        .create_hr_manager(NewHrManager {
          name,
          email,
          assigned_jobs: Vec::new(),
        })
        .await?;
      println!("Created HR manager {} ({})", manager.name, manager.id);
      Ok(())
    }

    Command::Users => {
      let result = client.users().await?;
      for user in &result.data {
        println!("{:<28} {}", user.name, user.email);
      }
      Ok(())
    }
  }
}
