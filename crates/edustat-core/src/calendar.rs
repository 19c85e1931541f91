//! Academic years and the terms that subdivide them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicYear {
  pub id:         i64,
  pub name:       String,
  pub start_date: Option<NaiveDate>,
  pub end_date:   Option<NaiveDate>,
  pub active:     bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAcademicYear {
  pub name:       String,
  #[serde(default)]
  pub start_date: Option<NaiveDate>,
  #[serde(default)]
  pub end_date:   Option<NaiveDate>,
  /// Marking a year active clears the flag on every other year.
  #[serde(default)]
  pub active:     bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Term {
  pub id:               i64,
  pub name:             String,
  pub academic_year_id: i64,
  pub start_date:       Option<NaiveDate>,
  pub end_date:         Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTerm {
  pub name:             String,
  pub academic_year_id: i64,
  #[serde(default)]
  pub start_date:       Option<NaiveDate>,
  #[serde(default)]
  pub end_date:         Option<NaiveDate>,
}
