//! Turning raw rows into validated performance records.
//!
//! Spreadsheets and XML documents both produce [`RawRecord`]s through
//! [`RecordSource`]. From there one path resolves entities, normalises the
//! numbers and checks ranges, so both formats fail rows the same way.

use edustat_core::{
  performance::{NewPerformanceRecord, PERCENT_MAX, Scope},
  store::PerformanceStore,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{IngestError, Result, entities::EntityCache, normalize::normalize_percentage};

/// Field values read from one row or element, before any interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
  /// How errors refer to this record, e.g. `Row 4` or `XML record 2`.
  pub label:           String,
  pub school:          Option<String>,
  pub subject:         Option<String>,
  pub average_score:   Option<String>,
  pub pass_rate:       Option<String>,
  pub attendance_rate: Option<String>,
}

/// Anything that can be read as a sequence of raw performance records.
pub trait RecordSource {
  /// Fails when the source has no recognisable record structure at all.
  fn raw_records(&self) -> Result<Vec<RawRecord>>;
}

/// What to do with a file when some of its rows are invalid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowErrorPolicy {
  /// Any invalid row rejects the whole file.
  #[default]
  Strict,
  /// Valid rows are kept and invalid ones reported as warnings.
  Lenient,
}

/// Outcome of reading every record of one file.
#[derive(Debug, Default)]
pub struct Extraction {
  pub records: Vec<NewPerformanceRecord>,
  pub errors:  Vec<String>,
}

impl Extraction {
  /// Apply `policy`, returning the records to persist and any warnings.
  pub fn finish(self, policy: RowErrorPolicy) -> Result<(Vec<NewPerformanceRecord>, Vec<String>)> {
    if self.errors.is_empty() {
      return Ok((self.records, Vec::new()));
    }
    match policy {
      RowErrorPolicy::Lenient if !self.records.is_empty() => Ok((self.records, self.errors)),
      _ => Err(IngestError::Rows(self.errors)),
    }
  }
}

/// Read every record of `source` in order, creating unknown schools and
/// subjects along the way.
///
/// Row problems are collected, never raised; only a source without any
/// record structure fails here.
pub async fn extract<S: PerformanceStore>(
  source: &impl RecordSource,
  store: &S,
  cache: &mut EntityCache,
  scope: Scope,
) -> Result<Extraction> {
  let mut extraction = Extraction::default();
  for raw in source.raw_records()? {
    match build_record(store, cache, scope, raw).await {
      Ok(record) => extraction.records.push(record),
      Err(message) => {
        warn!(%message, "skipping record");
        extraction.errors.push(message);
      }
    }
  }
  debug!(
    records = extraction.records.len(),
    errors = extraction.errors.len(),
    %scope,
    "extraction finished"
  );
  Ok(extraction)
}

/// Build one record, or the message describing why it cannot be built.
pub async fn build_record<S: PerformanceStore>(
  store: &S,
  cache: &mut EntityCache,
  scope: Scope,
  raw: RawRecord,
) -> std::result::Result<NewPerformanceRecord, String> {
  let label = raw.label;
  let (Some(school), Some(subject), Some(average_score), Some(pass_rate)) =
    (raw.school, raw.subject, raw.average_score, raw.pass_rate)
  else {
    return Err(format!("{label} has missing required data"));
  };

  let school_id = cache
    .resolve_school(store, &school)
    .await
    .map_err(|e| format!("{label}: Failed to create school \"{school}\": {e}"))?
    .id;
  let subject_id = cache
    .resolve_subject(store, &subject)
    .await
    .map_err(|e| format!("{label}: Failed to create subject \"{subject}\": {e}"))?
    .id;

  let (Some(average_score), Some(pass_rate)) = (
    normalize_percentage(Some(&average_score)),
    normalize_percentage(Some(&pass_rate)),
  ) else {
    return Err(format!("{label}: Invalid score or rate values"));
  };
  for (field, value) in [("average score", average_score), ("pass rate", pass_rate)] {
    if !in_range(value) {
      return Err(format!("{label}: {field} value out of range ({value})"));
    }
  }

  let attendance_rate = normalize_percentage(raw.attendance_rate.as_deref()).filter(|v| in_range(*v));

  Ok(NewPerformanceRecord {
    school_id,
    academic_year_id: scope.academic_year_id,
    term_id: scope.term_id,
    subject_id,
    average_score,
    pass_rate,
    attendance_rate,
  })
}

fn in_range(value: i64) -> bool { (0..=PERCENT_MAX).contains(&value) }

#[cfg(test)]
mod tests {
  use super::*;

  fn record(score: i64) -> NewPerformanceRecord {
    NewPerformanceRecord {
      school_id: 1,
      academic_year_id: 1,
      term_id: None,
      subject_id: 1,
      average_score: score,
      pass_rate: score,
      attendance_rate: None,
    }
  }

  #[test]
  fn clean_extraction_passes_either_policy() {
    for policy in [RowErrorPolicy::Strict, RowErrorPolicy::Lenient] {
      let extraction = Extraction { records: vec![record(50)], errors: vec![] };
      let (records, warnings) = extraction.finish(policy).unwrap();
      assert_eq!(records.len(), 1);
      assert!(warnings.is_empty());
    }
  }

  #[test]
  fn strict_discards_valid_rows() {
    let extraction = Extraction {
      records: vec![record(50)],
      errors:  vec!["Row 3 has missing required data".into()],
    };
    assert!(matches!(
      extraction.finish(RowErrorPolicy::Strict),
      Err(IngestError::Rows(errors)) if errors.len() == 1
    ));
  }

  #[test]
  fn lenient_keeps_valid_rows_as_warnings() {
    let extraction = Extraction {
      records: vec![record(50)],
      errors:  vec!["Row 3 has missing required data".into()],
    };
    let (records, warnings) = extraction.finish(RowErrorPolicy::Lenient).unwrap();
    assert_eq!(records, vec![record(50)]);
    assert_eq!(warnings, vec!["Row 3 has missing required data".to_string()]);
  }

  #[test]
  fn lenient_still_fails_with_nothing_valid() {
    let extraction = Extraction { records: vec![], errors: vec!["Row 2: x".into()] };
    assert!(extraction.finish(RowErrorPolicy::Lenient).is_err());
  }

  #[test]
  fn an_empty_file_is_not_an_error() {
    let (records, _) = Extraction::default().finish(RowErrorPolicy::Strict).unwrap();
    assert!(records.is_empty());
  }
}
