//! Error types for `edustat-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{field} must be between 0 and 100, got {value}")]
  OutOfRange { field: &'static str, value: i64 },

  #[error("name must not be empty")]
  EmptyName,

  #[error("unknown upload status: {0:?}")]
  UnknownUploadStatus(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
