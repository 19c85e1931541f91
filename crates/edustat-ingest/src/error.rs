//! Error types for `edustat-ingest`.

use edustat_core::performance::Scope;
use thiserror::Error;

/// Why an upload was not ingested.
///
/// The first group is raised before the file is parsed, the second while its
/// structure is read, and `Rows` after every row has been tried. `Store` and
/// `Io` are processing failures rather than problems with the file.
#[derive(Debug, Error)]
pub enum IngestError {
  // ── Format rejection ──────────────────────────────────────────────────
  #[error("Unsupported file type: {0}")]
  UnsupportedFormat(String),

  #[error("File is too large: {size} bytes exceeds the {limit} byte limit")]
  TooLarge { size: u64, limit: u64 },

  #[error("This file has already been processed for {0}")]
  DuplicateUpload(Scope),

  // ── Structural failure ────────────────────────────────────────────────
  #[error("Missing required headers: {}", .0.join(", "))]
  MissingHeaders(Vec<&'static str>),

  #[error("No performance data found in XML file")]
  NoPerformanceData,

  #[error("No worksheet found in the spreadsheet")]
  NoWorksheet,

  #[error("spreadsheet error: {0}")]
  Spreadsheet(String),

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("xml error: {0}")]
  Xml(String),

  // ── Row failures ──────────────────────────────────────────────────────
  #[error("Errors processing file: {}", .0.join("; "))]
  Rows(Vec<String>),

  // ── Processing failure ────────────────────────────────────────────────
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl IngestError {
  pub(crate) fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(err))
  }

  /// `true` when the file itself was at fault, `false` when processing broke.
  pub fn is_rejection(&self) -> bool { !matches!(self, Self::Store(_) | Self::Io(_)) }
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_headers_are_listed_in_one_message() {
    let err = IngestError::MissingHeaders(vec!["School", "Pass Rate"]);
    assert_eq!(err.to_string(), "Missing required headers: School, Pass Rate");
  }

  #[test]
  fn row_errors_are_joined() {
    let err = IngestError::Rows(vec!["Row 2 has missing required data".into(), "Row 4: x".into()]);
    assert_eq!(
      err.to_string(),
      "Errors processing file: Row 2 has missing required data; Row 4: x"
    );
  }

  #[test]
  fn only_processing_failures_are_not_rejections() {
    assert!(IngestError::NoPerformanceData.is_rejection());
    assert!(IngestError::DuplicateUpload(Scope::year(1)).is_rejection());
    assert!(!IngestError::Io(std::io::Error::other("disk")).is_rejection());
  }
}
