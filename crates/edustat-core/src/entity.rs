//! Reference entities: schools and subjects.
//!
//! Both are looked up by case-insensitive name and created lazily during
//! ingestion. Neither is ever deleted by the ingestion pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// School type assigned to schools created on the fly during ingestion.
pub const DEFAULT_SCHOOL_TYPE: &str = "Public";

/// Subject code used when a subject name has no ASCII alphanumerics.
pub const FALLBACK_SUBJECT_CODE: &str = "SUBJ";

const SUBJECT_CODE_LEN: usize = 4;

// ─── School ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct School {
  pub id:          i64,
  pub name:        String,
  pub location:    Option<String>,
  #[serde(rename = "type")]
  pub school_type: Option<String>,
  pub created_at:  DateTime<Utc>,
}

/// Input for [`PerformanceStore::create_school`](crate::store::PerformanceStore::create_school).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSchool {
  pub name:        String,
  #[serde(default)]
  pub location:    Option<String>,
  #[serde(default, rename = "type")]
  pub school_type: Option<String>,
}

impl NewSchool {
  /// The shape used when a school is first seen in an uploaded file: empty
  /// location, public type.
  pub fn discovered(name: impl Into<String>) -> Self {
    Self {
      name:        name.into(),
      location:    Some(String::new()),
      school_type: Some(DEFAULT_SCHOOL_TYPE.to_owned()),
    }
  }

  pub fn validate(&self) -> Result<()> { validate_name(&self.name) }
}

// ─── Subject ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
  pub id:         i64,
  pub name:       String,
  pub code:       Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubject {
  pub name: String,
  #[serde(default)]
  pub code: Option<String>,
}

impl NewSubject {
  /// A subject first seen in an uploaded file, with a code derived from its
  /// name.
  pub fn discovered(name: impl Into<String>) -> Self {
    let name = name.into();
    let code = subject_code(&name);
    Self { name, code: Some(code) }
  }

  pub fn validate(&self) -> Result<()> { validate_name(&self.name) }
}

/// Derive a subject code: the first four ASCII alphanumerics of `name`,
/// upper-cased, or [`FALLBACK_SUBJECT_CODE`] when there are none.
pub fn subject_code(name: &str) -> String {
  let code: String = name
    .chars()
    .filter(char::is_ascii_alphanumeric)
    .take(SUBJECT_CODE_LEN)
    .map(|c| c.to_ascii_uppercase())
    .collect();

  if code.is_empty() {
    FALLBACK_SUBJECT_CODE.to_owned()
  } else {
    code
  }
}

/// Case-insensitive name comparison shared by every entity lookup.
pub fn names_match(a: &str, b: &str) -> bool {
  a.to_lowercase() == b.to_lowercase()
}

fn validate_name(name: &str) -> Result<()> {
  if name.trim().is_empty() {
    return Err(Error::EmptyName);
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn subject_code_takes_first_four_alphanumerics() {
    assert_eq!(subject_code("Mathematics"), "MATH");
    assert_eq!(subject_code("Sc. Physiques"), "SCPH");
    assert_eq!(subject_code("3D art"), "3DAR");
  }

  #[test]
  fn subject_code_falls_back_without_ascii() {
    assert_eq!(subject_code("الرياضيات"), FALLBACK_SUBJECT_CODE);
    assert_eq!(subject_code(""), FALLBACK_SUBJECT_CODE);
  }

  #[test]
  fn short_names_keep_what_they_have() {
    assert_eq!(subject_code("PE"), "PE");
  }

  #[test]
  fn names_match_ignores_case_beyond_ascii() {
    assert!(names_match("Lycée X", "LYCÉE x"));
    assert!(!names_match("Lycee X", "Lycée X"));
  }

  #[test]
  fn discovered_school_is_public_with_empty_location() {
    let s = NewSchool::discovered("Alpha School");
    assert_eq!(s.location.as_deref(), Some(""));
    assert_eq!(s.school_type.as_deref(), Some("Public"));
  }

  #[test]
  fn blank_names_are_rejected() {
    assert!(matches!(NewSubject::discovered("  ").validate(), Err(Error::EmptyName)));
    assert!(NewSchool::discovered("Beta").validate().is_ok());
  }
}
