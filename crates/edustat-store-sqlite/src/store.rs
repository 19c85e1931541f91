//! [`SqliteStore`]: the SQLite implementation of [`PerformanceStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, types::Value};

use edustat_core::{
  calendar::{AcademicYear, NewAcademicYear, NewTerm, Term},
  entity::{NewSchool, NewSubject, School, Subject},
  performance::{
    IngestionCommit, NewPerformanceRecord, NewSummary, PerformanceRecord,
    SchoolPerformanceSummary, Scope,
  },
  store::PerformanceStore,
  upload::{FileUpload, NewUpload, UploadStatus},
};

use crate::{
  Error, Result,
  encode::{
    ACADEMIC_YEAR_COLUMNS, RECORD_COLUMNS, RawAcademicYear, RawRecord, RawSchool, RawSubject,
    RawSummary, RawTerm, RawUpload, SCHOOL_COLUMNS, SUBJECT_COLUMNS, SUMMARY_COLUMNS,
    TERM_COLUMNS, UPLOAD_COLUMNS, encode_date, encode_dt,
  },
  schema::SCHEMA,
};

type RowMapper<R> = fn(&rusqlite::Row<'_>) -> rusqlite::Result<R>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// An edustat store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a SELECT and map every row.
  async fn select_all<R>(&self, sql: String, params: Vec<Value>, map: RowMapper<R>) -> Result<Vec<R>>
  where
    R: Send + 'static,
  {
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), map)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  /// Run a SELECT expected to match at most one row.
  async fn select_one<R>(&self, sql: String, params: Vec<Value>, map: RowMapper<R>) -> Result<Option<R>>
  where
    R: Send + 'static,
  {
    let row = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&sql, rusqlite::params_from_iter(params), map).optional()?)
      })
      .await?;
    Ok(row)
  }

  async fn get_school(&self, id: i64) -> Result<Option<School>> {
    let raw = self
      .select_one(
        format!("SELECT {SCHOOL_COLUMNS} FROM schools WHERE id = ?1"),
        vec![Value::from(id)],
        RawSchool::from_row,
      )
      .await?;
    raw.map(RawSchool::into_school).transpose()
  }

  async fn get_subject(&self, id: i64) -> Result<Option<Subject>> {
    let raw = self
      .select_one(
        format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE id = ?1"),
        vec![Value::from(id)],
        RawSubject::from_row,
      )
      .await?;
    raw.map(RawSubject::into_subject).transpose()
  }

  async fn get_summary(&self, id: i64) -> Result<Option<SchoolPerformanceSummary>> {
    let raw = self
      .select_one(
        format!("SELECT {SUMMARY_COLUMNS} FROM school_performance_summaries WHERE id = ?1"),
        vec![Value::from(id)],
        RawSummary::from_row,
      )
      .await?;
    raw.map(RawSummary::into_summary).transpose()
  }

  /// Records for `column = id` within `scope`; a year-wide scope spans every
  /// term of the year.
  async fn records_where(
    &self,
    column: &'static str,
    id: i64,
    scope: Scope,
  ) -> Result<Vec<PerformanceRecord>> {
    let raws = self
      .select_all(
        format!(
          "SELECT {RECORD_COLUMNS} FROM performance_records
           WHERE {column} = ?1
             AND academic_year_id = ?2
             AND (?3 IS NULL OR term_id = ?3)
           ORDER BY id"
        ),
        vec![Value::from(id), Value::from(scope.academic_year_id), Value::from(scope.term_id)],
        RawRecord::from_row,
      )
      .await?;
    raws.into_iter().map(RawRecord::into_record).collect()
  }
}

// ─── PerformanceStore impl ───────────────────────────────────────────────────

impl PerformanceStore for SqliteStore {
  type Error = Error;

  // ── Schools & subjects ────────────────────────────────────────────────────

  async fn list_schools(&self) -> Result<Vec<School>> {
    let raws = self
      .select_all(
        format!("SELECT {SCHOOL_COLUMNS} FROM schools ORDER BY id"),
        vec![],
        RawSchool::from_row,
      )
      .await?;
    raws.into_iter().map(RawSchool::into_school).collect()
  }

  async fn create_school(&self, input: NewSchool) -> Result<School> {
    input.validate()?;

    let name     = input.name.clone();
    let at_str   = encode_dt(Utc::now());

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO schools (name, location, school_type, created_at) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![input.name, input.location, input.school_type, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await
      .map_err(|e| Error::from_insert(e, || format!("school {name:?} already exists")))?;

    tracing::debug!(id, name = %name, "created school");
    self.get_school(id).await?.ok_or_else(|| Error::Conflict(format!("school {id} vanished")))
  }

  async fn list_subjects(&self) -> Result<Vec<Subject>> {
    let raws = self
      .select_all(
        format!("SELECT {SUBJECT_COLUMNS} FROM subjects ORDER BY id"),
        vec![],
        RawSubject::from_row,
      )
      .await?;
    raws.into_iter().map(RawSubject::into_subject).collect()
  }

  async fn create_subject(&self, input: NewSubject) -> Result<Subject> {
    input.validate()?;

    let name   = input.name.clone();
    let at_str = encode_dt(Utc::now());

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO subjects (name, code, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![input.name, input.code, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await
      .map_err(|e| Error::from_insert(e, || format!("subject {name:?} already exists")))?;

    tracing::debug!(id, name = %name, "created subject");
    self.get_subject(id).await?.ok_or_else(|| Error::Conflict(format!("subject {id} vanished")))
  }

  // ── Academic calendar ─────────────────────────────────────────────────────

  async fn create_academic_year(&self, input: NewAcademicYear) -> Result<AcademicYear> {
    let name  = input.name.clone();
    let start = input.start_date.map(encode_date);
    let end   = input.end_date.map(encode_date);

    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if input.active {
          tx.execute("UPDATE academic_years SET active = 0", [])?;
        }
        tx.execute(
          "INSERT INTO academic_years (name, start_date, end_date, active) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![input.name, start, end, input.active],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
      })
      .await
      .map_err(|e| Error::from_insert(e, || format!("academic year {name:?} already exists")))?;

    self.get_academic_year(id).await?.ok_or(Error::AcademicYearNotFound(id))
  }

  async fn list_academic_years(&self) -> Result<Vec<AcademicYear>> {
    let raws = self
      .select_all(
        format!("SELECT {ACADEMIC_YEAR_COLUMNS} FROM academic_years ORDER BY id"),
        vec![],
        RawAcademicYear::from_row,
      )
      .await?;
    raws.into_iter().map(RawAcademicYear::into_academic_year).collect()
  }

  async fn get_academic_year(&self, id: i64) -> Result<Option<AcademicYear>> {
    let raw = self
      .select_one(
        format!("SELECT {ACADEMIC_YEAR_COLUMNS} FROM academic_years WHERE id = ?1"),
        vec![Value::from(id)],
        RawAcademicYear::from_row,
      )
      .await?;
    raw.map(RawAcademicYear::into_academic_year).transpose()
  }

  async fn active_academic_year(&self) -> Result<Option<AcademicYear>> {
    let raw = self
      .select_one(
        format!(
          "SELECT {ACADEMIC_YEAR_COLUMNS} FROM academic_years WHERE active = 1 ORDER BY id LIMIT 1"
        ),
        vec![],
        RawAcademicYear::from_row,
      )
      .await?;
    raw.map(RawAcademicYear::into_academic_year).transpose()
  }

  async fn create_term(&self, input: NewTerm) -> Result<Term> {
    if self.get_academic_year(input.academic_year_id).await?.is_none() {
      return Err(Error::AcademicYearNotFound(input.academic_year_id));
    }

    let start = input.start_date.map(encode_date);
    let end   = input.end_date.map(encode_date);

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO terms (name, academic_year_id, start_date, end_date) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![input.name, input.academic_year_id, start, end],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    self
      .get_term(id)
      .await?
      .ok_or_else(|| Error::Conflict(format!("term {id} vanished")))
  }

  async fn list_terms(&self, academic_year_id: i64) -> Result<Vec<Term>> {
    let raws = self
      .select_all(
        format!("SELECT {TERM_COLUMNS} FROM terms WHERE academic_year_id = ?1 ORDER BY id"),
        vec![Value::from(academic_year_id)],
        RawTerm::from_row,
      )
      .await?;
    raws.into_iter().map(RawTerm::into_term).collect()
  }

  async fn get_term(&self, id: i64) -> Result<Option<Term>> {
    let raw = self
      .select_one(
        format!("SELECT {TERM_COLUMNS} FROM terms WHERE id = ?1"),
        vec![Value::from(id)],
        RawTerm::from_row,
      )
      .await?;
    raw.map(RawTerm::into_term).transpose()
  }

  // ── Performance records ───────────────────────────────────────────────────

  async fn list_performance_records(
    &self,
    school_id: i64,
    scope: Scope,
  ) -> Result<Vec<PerformanceRecord>> {
    self.records_where("school_id", school_id, scope).await
  }

  async fn list_performance_records_by_subject(
    &self,
    subject_id: i64,
    scope: Scope,
  ) -> Result<Vec<PerformanceRecord>> {
    self.records_where("subject_id", subject_id, scope).await
  }

  async fn bulk_insert_performance_records(
    &self,
    records: Vec<NewPerformanceRecord>,
  ) -> Result<Vec<PerformanceRecord>> {
    for record in &records {
      record.validate()?;
    }

    let now    = Utc::now();
    let at_str = encode_dt(now);
    let batch  = records.clone();

    let ids: Vec<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let ids = insert_records(&tx, &batch, &at_str)?;
        tx.commit()?;
        Ok(ids)
      })
      .await?;

    Ok(
      ids
        .into_iter()
        .zip(records)
        .map(|(id, r)| PerformanceRecord {
          id,
          school_id:        r.school_id,
          academic_year_id: r.academic_year_id,
          term_id:          r.term_id,
          subject_id:       r.subject_id,
          average_score:    r.average_score,
          pass_rate:        r.pass_rate,
          attendance_rate:  r.attendance_rate,
          created_at:       now,
        })
        .collect(),
    )
  }

  // ── Summaries ─────────────────────────────────────────────────────────────

  async fn find_summary(
    &self,
    school_id: i64,
    scope: Scope,
  ) -> Result<Option<SchoolPerformanceSummary>> {
    let raw = self
      .select_one(
        format!(
          "SELECT {SUMMARY_COLUMNS} FROM school_performance_summaries
           WHERE school_id = ?1 AND academic_year_id = ?2 AND term_id IS ?3
           ORDER BY id LIMIT 1"
        ),
        vec![Value::from(school_id), Value::from(scope.academic_year_id), Value::from(scope.term_id)],
        RawSummary::from_row,
      )
      .await?;
    raw.map(RawSummary::into_summary).transpose()
  }

  async fn upsert_summary(
    &self,
    existing: Option<i64>,
    summary: NewSummary,
  ) -> Result<SchoolPerformanceSummary> {
    let at_str = encode_dt(Utc::now());

    let id = match existing {
      Some(id) => {
        let changed = self
          .conn
          .call(move |conn| {
            Ok(conn.execute(
              "UPDATE school_performance_summaries SET
                 school_id = ?2, academic_year_id = ?3, term_id = ?4,
                 overall_average = ?5, success_rate = ?6, attendance_rate = ?7,
                 improvement_rate = ?8, ranking = ?9
               WHERE id = ?1",
              rusqlite::params![
                id,
                summary.school_id,
                summary.academic_year_id,
                summary.term_id,
                summary.overall_average,
                summary.success_rate,
                summary.attendance_rate,
                summary.improvement_rate,
                summary.ranking,
              ],
            )?)
          })
          .await?;
        if changed == 0 {
          return Err(Error::SummaryNotFound(id));
        }
        id
      }
      None => {
        self
          .conn
          .call(move |conn| {
            conn.execute(
              "INSERT INTO school_performance_summaries (
                 school_id, academic_year_id, term_id, overall_average, success_rate,
                 attendance_rate, improvement_rate, ranking, created_at
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
              rusqlite::params![
                summary.school_id,
                summary.academic_year_id,
                summary.term_id,
                summary.overall_average,
                summary.success_rate,
                summary.attendance_rate,
                summary.improvement_rate,
                summary.ranking,
                at_str,
              ],
            )?;
            Ok(conn.last_insert_rowid())
          })
          .await?
      }
    };

    self.get_summary(id).await?.ok_or(Error::SummaryNotFound(id))
  }

  async fn list_summaries(&self, scope: Scope) -> Result<Vec<SchoolPerformanceSummary>> {
    let raws = self
      .select_all(
        format!(
          "SELECT {SUMMARY_COLUMNS} FROM school_performance_summaries
           WHERE academic_year_id = ?1 AND term_id IS ?2
           ORDER BY ranking IS NULL, ranking, id"
        ),
        vec![Value::from(scope.academic_year_id), Value::from(scope.term_id)],
        RawSummary::from_row,
      )
      .await?;
    raws.into_iter().map(RawSummary::into_summary).collect()
  }

  async fn commit_ingestion(
    &self,
    records: Vec<NewPerformanceRecord>,
    summaries: Vec<NewSummary>,
  ) -> Result<IngestionCommit> {
    for record in &records {
      record.validate()?;
    }
    let at_str = encode_dt(Utc::now());

    let commit = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let record_ids = insert_records(&tx, &records, &at_str)?;
        let summary_ids = summaries
          .iter()
          .map(|summary| write_summary(&tx, summary, &at_str))
          .collect::<rusqlite::Result<Vec<_>>>()?;
        tx.commit()?;
        Ok(IngestionCommit { record_ids, summary_ids })
      })
      .await?;
    tracing::debug!(
      records = commit.record_ids.len(),
      summaries = commit.summary_ids.len(),
      "committed ingestion"
    );
    Ok(commit)
  }

  // ── Upload ledger ─────────────────────────────────────────────────────────

  async fn create_upload(&self, input: NewUpload) -> Result<FileUpload> {
    let at_str = encode_dt(Utc::now());
    let status = UploadStatus::Processing.as_ref().to_owned();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO file_uploads (
             filename, file_size, academic_year_id, term_id, status, content_hash, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            input.filename,
            input.file_size,
            input.academic_year_id,
            input.term_id,
            status,
            input.content_hash,
            at_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    self.get_upload(id).await?.ok_or(Error::UploadNotFound(id))
  }

  async fn set_upload_status(&self, id: i64, status: UploadStatus) -> Result<FileUpload> {
    let status_str = status.as_ref().to_owned();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE file_uploads SET status = ?2 WHERE id = ?1",
          rusqlite::params![id, status_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::UploadNotFound(id));
    }
    self.get_upload(id).await?.ok_or(Error::UploadNotFound(id))
  }

  async fn get_upload(&self, id: i64) -> Result<Option<FileUpload>> {
    let raw = self
      .select_one(
        format!("SELECT {UPLOAD_COLUMNS} FROM file_uploads WHERE id = ?1"),
        vec![Value::from(id)],
        RawUpload::from_row,
      )
      .await?;
    raw.map(RawUpload::into_upload).transpose()
  }

  async fn list_uploads(&self) -> Result<Vec<FileUpload>> {
    let raws = self
      .select_all(
        format!("SELECT {UPLOAD_COLUMNS} FROM file_uploads ORDER BY id DESC"),
        vec![],
        RawUpload::from_row,
      )
      .await?;
    raws.into_iter().map(RawUpload::into_upload).collect()
  }

  async fn has_processed_upload(&self, content_hash: &str, scope: Scope) -> Result<bool> {
    let hash   = content_hash.to_owned();
    let status = UploadStatus::Processed.as_ref().to_owned();

    let found = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT EXISTS (
             SELECT 1 FROM file_uploads
             WHERE content_hash = ?1 AND academic_year_id = ?2 AND term_id IS ?3 AND status = ?4
           )",
          rusqlite::params![hash, scope.academic_year_id, scope.term_id, status],
          |row| row.get::<_, bool>(0),
        )?)
      })
      .await?;
    Ok(found)
  }
}

// ─── Transaction helpers ─────────────────────────────────────────────────────

fn insert_records(
  tx: &rusqlite::Transaction<'_>,
  records: &[NewPerformanceRecord],
  at_str: &str,
) -> rusqlite::Result<Vec<i64>> {
  let mut stmt = tx.prepare(
    "INSERT INTO performance_records (
       school_id, academic_year_id, term_id, subject_id,
       average_score, pass_rate, attendance_rate, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
  )?;
  let mut ids = Vec::with_capacity(records.len());
  for r in records {
    stmt.execute(rusqlite::params![
      r.school_id,
      r.academic_year_id,
      r.term_id,
      r.subject_id,
      r.average_score,
      r.pass_rate,
      r.attendance_rate,
      at_str,
    ])?;
    ids.push(tx.last_insert_rowid());
  }
  Ok(ids)
}

/// Overwrite the summary for the same school and exact scope, or insert one.
fn write_summary(tx: &rusqlite::Transaction<'_>, summary: &NewSummary, at_str: &str) -> rusqlite::Result<i64> {
  let existing: Option<i64> = tx
    .query_row(
      "SELECT id FROM school_performance_summaries
       WHERE school_id = ?1 AND academic_year_id = ?2 AND term_id IS ?3
       ORDER BY id LIMIT 1",
      rusqlite::params![summary.school_id, summary.academic_year_id, summary.term_id],
      |row| row.get(0),
    )
    .optional()?;

  match existing {
    Some(id) => {
      tx.execute(
        "UPDATE school_performance_summaries SET
           overall_average = ?2, success_rate = ?3, attendance_rate = ?4,
           improvement_rate = ?5, ranking = ?6
         WHERE id = ?1",
        rusqlite::params![
          id,
          summary.overall_average,
          summary.success_rate,
          summary.attendance_rate,
          summary.improvement_rate,
          summary.ranking,
        ],
      )?;
      Ok(id)
    }
    None => {
      tx.execute(
        "INSERT INTO school_performance_summaries (
           school_id, academic_year_id, term_id, overall_average, success_rate,
           attendance_rate, improvement_rate, ranking, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
          summary.school_id,
          summary.academic_year_id,
          summary.term_id,
          summary.overall_average,
          summary.success_rate,
          summary.attendance_rate,
          summary.improvement_rate,
          summary.ranking,
          at_str,
        ],
      )?;
      Ok(tx.last_insert_rowid())
    }
  }
}
