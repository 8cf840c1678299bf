use thiserror::Error;

/// Failures surfaced by the store, the transport and the query cache.
///
/// Every variant is local to the operation that produced it; callers can
/// match on the kind to decide between rollback, retry prompt or display.
#[derive(Error, Debug)]
pub enum Error {
  /// Injected server error from the simulated transport
  #[error("server error on {route}: {message}")]
  Transport { route: &'static str, message: String },

  #[error("{entity} not found: {id}")]
  NotFound { entity: &'static str, id: String },

  /// A uniqueness rule would be violated; nothing was written
  #[error("conflict: {0}")]
  Conflict(String),

  /// Malformed input, rejected before touching the store
  #[error("invalid input: {0}")]
  Validation(String),

  #[error("storage error: {0}")]
  Storage(#[from] rusqlite::Error),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("lock poisoned: {0}")]
  LockPoisoned(String),
}

impl Error {
  pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
    Self::NotFound {
      entity,
      id: id.into(),
    }
  }

  /// True for failures a user may simply retry.
  pub fn is_transient(&self) -> bool {
    matches!(self, Self::Transport { .. })
  }

  pub fn is_conflict(&self) -> bool {
    matches!(self, Self::Conflict(_))
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::NotFound { .. })
  }
}

impl From<validator::ValidationErrors> for Error {
  fn from(errors: validator::ValidationErrors) -> Self {
    let mut fields: Vec<String> = errors
      .field_errors()
      .into_iter()
      .map(|(field, errs)| {
        let messages: Vec<String> = errs
          .iter()
          .map(|e| {
            e.message
              .as_ref()
              .map(|m| m.to_string())
              .unwrap_or_else(|| e.code.to_string())
          })
          .collect();
        format!("{}: {}", field, messages.join(", "))
      })
      .collect();
    fields.sort();
    Self::Validation(fields.join("; "))
  }
}

pub type Result<T> = std::result::Result<T, Error>;
