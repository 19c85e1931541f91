//! The `PerformanceStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `edustat-store-sqlite`).
//! The ingestion pipeline and the HTTP layer depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use crate::{
  calendar::{AcademicYear, NewAcademicYear, NewTerm, Term},
  entity::{NewSchool, NewSubject, School, Subject},
  performance::{
    IngestionCommit, NewPerformanceRecord, NewSummary, PerformanceRecord,
    SchoolPerformanceSummary, Scope,
  },
  upload::{FileUpload, NewUpload, UploadStatus},
};

/// Abstraction over an edustat storage backend.
///
/// Performance records are append-only. Summaries are a recomputable cache
/// keyed by (school, academic year, term) and are overwritten in place.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait PerformanceStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Schools & subjects ────────────────────────────────────────────────

  /// List all schools in ascending id order.
  fn list_schools(&self) -> impl Future<Output = Result<Vec<School>, Self::Error>> + Send + '_;

  /// Persist a new school. Fails if a school with the same name
  /// (case-insensitive) already exists.
  fn create_school(
    &self,
    input: NewSchool,
  ) -> impl Future<Output = Result<School, Self::Error>> + Send + '_;

  /// List all subjects in ascending id order.
  fn list_subjects(&self) -> impl Future<Output = Result<Vec<Subject>, Self::Error>> + Send + '_;

  fn create_subject(
    &self,
    input: NewSubject,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + '_;

  // ── Academic calendar ─────────────────────────────────────────────────

  fn create_academic_year(
    &self,
    input: NewAcademicYear,
  ) -> impl Future<Output = Result<AcademicYear, Self::Error>> + Send + '_;

  fn list_academic_years(
    &self,
  ) -> impl Future<Output = Result<Vec<AcademicYear>, Self::Error>> + Send + '_;

  fn get_academic_year(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<AcademicYear>, Self::Error>> + Send + '_;

  /// The year flagged `active`, if any.
  fn active_academic_year(
    &self,
  ) -> impl Future<Output = Result<Option<AcademicYear>, Self::Error>> + Send + '_;

  fn create_term(&self, input: NewTerm)
  -> impl Future<Output = Result<Term, Self::Error>> + Send + '_;

  fn list_terms(
    &self,
    academic_year_id: i64,
  ) -> impl Future<Output = Result<Vec<Term>, Self::Error>> + Send + '_;

  fn get_term(&self, id: i64) -> impl Future<Output = Result<Option<Term>, Self::Error>> + Send + '_;

  // ── Performance records (append-only) ─────────────────────────────────

  /// Records for one school within `scope`. A year-wide scope
  /// (`term_id: None`) also returns records stored against any term of
  /// that year.
  fn list_performance_records(
    &self,
    school_id: i64,
    scope: Scope,
  ) -> impl Future<Output = Result<Vec<PerformanceRecord>, Self::Error>> + Send + '_;

  /// Records for one subject within `scope`, with the same term semantics as
  /// [`Self::list_performance_records`].
  fn list_performance_records_by_subject(
    &self,
    subject_id: i64,
    scope: Scope,
  ) -> impl Future<Output = Result<Vec<PerformanceRecord>, Self::Error>> + Send + '_;

  /// Insert every record or none of them.
  fn bulk_insert_performance_records(
    &self,
    records: Vec<NewPerformanceRecord>,
  ) -> impl Future<Output = Result<Vec<PerformanceRecord>, Self::Error>> + Send + '_;

  // ── Summaries ─────────────────────────────────────────────────────────

  /// The summary stored for exactly (`school_id`, `scope`). A year-wide scope
  /// only matches year-wide summaries.
  fn find_summary(
    &self,
    school_id: i64,
    scope: Scope,
  ) -> impl Future<Output = Result<Option<SchoolPerformanceSummary>, Self::Error>> + Send + '_;

  /// Overwrite summary `existing` in place, or insert a new row when
  /// `existing` is `None`.
  fn upsert_summary(
    &self,
    existing: Option<i64>,
    summary: NewSummary,
  ) -> impl Future<Output = Result<SchoolPerformanceSummary, Self::Error>> + Send + '_;

  /// All summaries stored for exactly `scope`, best ranking first.
  fn list_summaries(
    &self,
    scope: Scope,
  ) -> impl Future<Output = Result<Vec<SchoolPerformanceSummary>, Self::Error>> + Send + '_;

  /// Insert `records` and write every summary, replacing the row stored for
  /// the same school and exact scope, in a single transaction. Either all of
  /// it is written or none of it.
  fn commit_ingestion(
    &self,
    records: Vec<NewPerformanceRecord>,
    summaries: Vec<NewSummary>,
  ) -> impl Future<Output = Result<IngestionCommit, Self::Error>> + Send + '_;

  // ── Upload ledger ─────────────────────────────────────────────────────

  /// Record a new upload in [`UploadStatus::Processing`].
  fn create_upload(
    &self,
    input: NewUpload,
  ) -> impl Future<Output = Result<FileUpload, Self::Error>> + Send + '_;

  fn set_upload_status(
    &self,
    id: i64,
    status: UploadStatus,
  ) -> impl Future<Output = Result<FileUpload, Self::Error>> + Send + '_;

  fn get_upload(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<FileUpload>, Self::Error>> + Send + '_;

  /// All uploads, newest first.
  fn list_uploads(&self) -> impl Future<Output = Result<Vec<FileUpload>, Self::Error>> + Send + '_;

  /// Whether a `processed` upload with this content hash exists for `scope`.
  fn has_processed_upload<'a>(
    &'a self,
    content_hash: &'a str,
    scope: Scope,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}
