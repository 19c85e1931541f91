//! Error type for `edustat-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] edustat_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A uniqueness constraint rejected the write (e.g. a duplicate name).
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("academic year not found: {0}")]
  AcademicYearNotFound(i64),

  #[error("upload not found: {0}")]
  UploadNotFound(i64),

  #[error("summary not found: {0}")]
  SummaryNotFound(i64),
}

impl Error {
  /// Map a failed insert to [`Error::Conflict`] when SQLite reports a
  /// constraint violation; pass every other error through.
  pub(crate) fn from_insert(err: tokio_rusqlite::Error, what: impl FnOnce() -> String) -> Self {
    match err {
      tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(ref e, _))
        if e.code == rusqlite::ErrorCode::ConstraintViolation =>
      {
        Error::Conflict(what())
      }
      other => Error::Database(other),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
