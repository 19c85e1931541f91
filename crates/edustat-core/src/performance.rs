//! Performance observations and the per-school summaries derived from them.
//!
//! A [`PerformanceRecord`] is one (school, subject, year, term) observation
//! taken from one uploaded file. Records are immutable once stored and are
//! never deduplicated: uploading the same data twice stores it twice.
//!
//! A [`SchoolPerformanceSummary`] is a derived cache. It is recomputed from
//! every record in its [`Scope`] whenever new data arrives for that scope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Highest value a percentage-like field may hold after normalisation.
pub const PERCENT_MAX: i64 = 100;

// ─── Scope ───────────────────────────────────────────────────────────────────

/// The (academic year, term) pair bounding a read or a recomputation.
/// `term_id: None` means the whole year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
  pub academic_year_id: i64,
  pub term_id:          Option<i64>,
}

impl Scope {
  pub fn new(academic_year_id: i64, term_id: Option<i64>) -> Self {
    Self { academic_year_id, term_id }
  }

  pub fn year(academic_year_id: i64) -> Self { Self::new(academic_year_id, None) }
}

impl std::fmt::Display for Scope {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self.term_id {
      Some(term) => write!(f, "year {} / term {term}", self.academic_year_id),
      None       => write!(f, "year {}", self.academic_year_id),
    }
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A validated observation ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPerformanceRecord {
  pub school_id:        i64,
  pub academic_year_id: i64,
  pub term_id:          Option<i64>,
  pub subject_id:       i64,
  pub average_score:    i64,
  pub pass_rate:        i64,
  pub attendance_rate:  Option<i64>,
}

impl NewPerformanceRecord {
  pub fn scope(&self) -> Scope { Scope::new(self.academic_year_id, self.term_id) }

  /// Check that every percentage field lies in `0..=100`.
  pub fn validate(&self) -> Result<()> {
    check_percent("averageScore", self.average_score)?;
    check_percent("passRate", self.pass_rate)?;
    if let Some(rate) = self.attendance_rate {
      check_percent("attendanceRate", rate)?;
    }
    Ok(())
  }
}

/// A stored observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRecord {
  pub id:               i64,
  pub school_id:        i64,
  pub academic_year_id: i64,
  pub term_id:          Option<i64>,
  pub subject_id:       i64,
  pub average_score:    i64,
  pub pass_rate:        i64,
  pub attendance_rate:  Option<i64>,
  pub created_at:       DateTime<Utc>,
}

/// Returns `Ok(())` if `value` is a valid 0–100 percentage.
pub fn check_percent(field: &'static str, value: i64) -> Result<()> {
  if (0..=PERCENT_MAX).contains(&value) {
    Ok(())
  } else {
    Err(Error::OutOfRange { field, value })
  }
}

// ─── Summaries ───────────────────────────────────────────────────────────────

/// A freshly computed, not yet persisted, per-school summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSummary {
  pub school_id:        i64,
  pub academic_year_id: i64,
  pub term_id:          Option<i64>,
  pub overall_average:  i64,
  pub success_rate:     i64,
  pub attendance_rate:  Option<i64>,
  /// Reserved for a historical comparison; never computed today.
  pub improvement_rate: Option<i64>,
  /// 1-based position within the scope, ordered by `overall_average`.
  pub ranking:          i64,
}

impl NewSummary {
  pub fn scope(&self) -> Scope { Scope::new(self.academic_year_id, self.term_id) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolPerformanceSummary {
  pub id:               i64,
  pub school_id:        i64,
  pub academic_year_id: i64,
  pub term_id:          Option<i64>,
  pub overall_average:  i64,
  pub success_rate:     i64,
  pub attendance_rate:  Option<i64>,
  pub improvement_rate: Option<i64>,
  pub ranking:          Option<i64>,
  pub created_at:       DateTime<Utc>,
}

/// Row ids written by [`PerformanceStore::commit_ingestion`](crate::store::PerformanceStore::commit_ingestion).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionCommit {
  pub record_ids:  Vec<i64>,
  /// One id per summary, in input order; reused ids mean the row was
  /// overwritten.
  pub summary_ids: Vec<i64>,
}
