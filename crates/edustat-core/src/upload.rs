//! The upload ledger: one row per file submitted for ingestion.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result};

/// Where an upload is in its lifecycle.
///
/// `Processing` is set once the file passes format checks; it ends in either
/// `Processed` or `Error`. There is no partially processed state.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UploadStatus {
  Processing,
  Processed,
  Error,
}

impl UploadStatus {
  pub fn parse(s: &str) -> Result<Self> {
    Self::from_str(s).map_err(|_| Error::UnknownUploadStatus(s.to_owned()))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUpload {
  pub id:               i64,
  pub filename:         String,
  pub file_size:        i64,
  pub academic_year_id: i64,
  pub term_id:          Option<i64>,
  pub status:           UploadStatus,
  /// Lowercase hex SHA-256 of the raw file bytes.
  pub content_hash:     String,
  pub created_at:       DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUpload {
  pub filename:         String,
  pub file_size:        i64,
  pub academic_year_id: i64,
  pub term_id:          Option<i64>,
  pub content_hash:     String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_round_trips_through_text() {
    for status in [UploadStatus::Processing, UploadStatus::Processed, UploadStatus::Error] {
      assert_eq!(UploadStatus::parse(status.as_ref()).unwrap(), status);
    }
    assert_eq!(UploadStatus::Processed.to_string(), "processed");
  }

  #[test]
  fn unknown_status_is_an_error() {
    assert!(matches!(
      UploadStatus::parse("queued"),
      Err(Error::UnknownUploadStatus(s)) if s == "queued"
    ));
  }
}
