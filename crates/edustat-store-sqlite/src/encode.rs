//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, calendar dates as `YYYY-MM-DD`.
//! Each `Raw*` struct mirrors one table row exactly as SQLite returns it.

use chrono::{DateTime, NaiveDate, Utc};
use edustat_core::{
  calendar::{AcademicYear, Term},
  entity::{School, Subject},
  performance::{PerformanceRecord, SchoolPerformanceSummary},
  upload::{FileUpload, UploadStatus},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

fn decode_opt_date(s: Option<String>) -> Result<Option<NaiveDate>> {
  s.as_deref().map(decode_date).transpose()
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const SCHOOL_COLUMNS: &str = "id, name, location, school_type, created_at";

pub struct RawSchool {
  pub id:          i64,
  pub name:        String,
  pub location:    Option<String>,
  pub school_type: Option<String>,
  pub created_at:  String,
}

impl RawSchool {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      name:        row.get(1)?,
      location:    row.get(2)?,
      school_type: row.get(3)?,
      created_at:  row.get(4)?,
    })
  }

  pub fn into_school(self) -> Result<School> {
    Ok(School {
      id:          self.id,
      name:        self.name,
      location:    self.location,
      school_type: self.school_type,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub const SUBJECT_COLUMNS: &str = "id, name, code, created_at";

pub struct RawSubject {
  pub id:         i64,
  pub name:       String,
  pub code:       Option<String>,
  pub created_at: String,
}

impl RawSubject {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      name:       row.get(1)?,
      code:       row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      id:         self.id,
      name:       self.name,
      code:       self.code,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const ACADEMIC_YEAR_COLUMNS: &str = "id, name, start_date, end_date, active";

pub struct RawAcademicYear {
  pub id:         i64,
  pub name:       String,
  pub start_date: Option<String>,
  pub end_date:   Option<String>,
  pub active:     bool,
}

impl RawAcademicYear {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      name:       row.get(1)?,
      start_date: row.get(2)?,
      end_date:   row.get(3)?,
      active:     row.get(4)?,
    })
  }

  pub fn into_academic_year(self) -> Result<AcademicYear> {
    Ok(AcademicYear {
      id:         self.id,
      name:       self.name,
      start_date: decode_opt_date(self.start_date)?,
      end_date:   decode_opt_date(self.end_date)?,
      active:     self.active,
    })
  }
}

pub const TERM_COLUMNS: &str = "id, name, academic_year_id, start_date, end_date";

pub struct RawTerm {
  pub id:               i64,
  pub name:             String,
  pub academic_year_id: i64,
  pub start_date:       Option<String>,
  pub end_date:         Option<String>,
}

impl RawTerm {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(0)?,
      name:             row.get(1)?,
      academic_year_id: row.get(2)?,
      start_date:       row.get(3)?,
      end_date:         row.get(4)?,
    })
  }

  pub fn into_term(self) -> Result<Term> {
    Ok(Term {
      id:               self.id,
      name:             self.name,
      academic_year_id: self.academic_year_id,
      start_date:       decode_opt_date(self.start_date)?,
      end_date:         decode_opt_date(self.end_date)?,
    })
  }
}

pub const RECORD_COLUMNS: &str = "id, school_id, academic_year_id, term_id, subject_id, \
                                  average_score, pass_rate, attendance_rate, created_at";

pub struct RawRecord {
  pub id:               i64,
  pub school_id:        i64,
  pub academic_year_id: i64,
  pub term_id:          Option<i64>,
  pub subject_id:       i64,
  pub average_score:    i64,
  pub pass_rate:        i64,
  pub attendance_rate:  Option<i64>,
  pub created_at:       String,
}

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(0)?,
      school_id:        row.get(1)?,
      academic_year_id: row.get(2)?,
      term_id:          row.get(3)?,
      subject_id:       row.get(4)?,
      average_score:    row.get(5)?,
      pass_rate:        row.get(6)?,
      attendance_rate:  row.get(7)?,
      created_at:       row.get(8)?,
    })
  }

  pub fn into_record(self) -> Result<PerformanceRecord> {
    Ok(PerformanceRecord {
      id:               self.id,
      school_id:        self.school_id,
      academic_year_id: self.academic_year_id,
      term_id:          self.term_id,
      subject_id:       self.subject_id,
      average_score:    self.average_score,
      pass_rate:        self.pass_rate,
      attendance_rate:  self.attendance_rate,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

pub const SUMMARY_COLUMNS: &str = "id, school_id, academic_year_id, term_id, overall_average, \
                                   success_rate, attendance_rate, improvement_rate, ranking, \
                                   created_at";

pub struct RawSummary {
  pub id:               i64,
  pub school_id:        i64,
  pub academic_year_id: i64,
  pub term_id:          Option<i64>,
  pub overall_average:  i64,
  pub success_rate:     i64,
  pub attendance_rate:  Option<i64>,
  pub improvement_rate: Option<i64>,
  pub ranking:          Option<i64>,
  pub created_at:       String,
}

impl RawSummary {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(0)?,
      school_id:        row.get(1)?,
      academic_year_id: row.get(2)?,
      term_id:          row.get(3)?,
      overall_average:  row.get(4)?,
      success_rate:     row.get(5)?,
      attendance_rate:  row.get(6)?,
      improvement_rate: row.get(7)?,
      ranking:          row.get(8)?,
      created_at:       row.get(9)?,
    })
  }

  pub fn into_summary(self) -> Result<SchoolPerformanceSummary> {
    Ok(SchoolPerformanceSummary {
      id:               self.id,
      school_id:        self.school_id,
      academic_year_id: self.academic_year_id,
      term_id:          self.term_id,
      overall_average:  self.overall_average,
      success_rate:     self.success_rate,
      attendance_rate:  self.attendance_rate,
      improvement_rate: self.improvement_rate,
      ranking:          self.ranking,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

pub const UPLOAD_COLUMNS: &str = "id, filename, file_size, academic_year_id, term_id, status, \
                                  content_hash, created_at";

pub struct RawUpload {
  pub id:               i64,
  pub filename:         String,
  pub file_size:        i64,
  pub academic_year_id: i64,
  pub term_id:          Option<i64>,
  pub status:           String,
  pub content_hash:     String,
  pub created_at:       String,
}

impl RawUpload {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(0)?,
      filename:         row.get(1)?,
      file_size:        row.get(2)?,
      academic_year_id: row.get(3)?,
      term_id:          row.get(4)?,
      status:           row.get(5)?,
      content_hash:     row.get(6)?,
      created_at:       row.get(7)?,
    })
  }

  pub fn into_upload(self) -> Result<FileUpload> {
    Ok(FileUpload {
      id:               self.id,
      filename:         self.filename,
      file_size:        self.file_size,
      academic_year_id: self.academic_year_id,
      term_id:          self.term_id,
      status:           UploadStatus::parse(&self.status)?,
      content_hash:     self.content_hash,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn date_round_trip() {
    let d = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
    assert_eq!(encode_date(d), "2024-09-01");
    assert_eq!(decode_date("2024-09-01").unwrap(), d);
  }

  #[test]
  fn bad_date_is_a_parse_error() {
    assert!(matches!(decode_date("01/09/2024"), Err(Error::DateParse(_))));
  }

  #[test]
  fn timestamp_round_trip() {
    let ts = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
    assert_eq!(decode_dt(&encode_dt(ts)).unwrap(), ts);
  }
}
