//! Error type for `cmti-store-sqlite`.

use cmti_core::identifier::SiteId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] cmti_core::Error),

  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A uniqueness or foreign-key rule refused the write. Nothing was kept.
  #[error("integrity violation: {0}")]
  Integrity(String),

  /// A stored value no longer parses.
  #[error("corrupt stored value: {0}")]
  Decode(String),

  #[error("mine not found: {0}")]
  MineNotFound(SiteId),

  #[error("facility not found: {0}")]
  FacilityNotFound(uuid::Uuid),
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(err: tokio_rusqlite::Error) -> Self {
    match &err {
      tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(code, message))
        if code.code == rusqlite::ErrorCode::ConstraintViolation =>
      {
        Error::Integrity(message.clone().unwrap_or_else(|| code.to_string()))
      }
      _ => Error::Database(err),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
