//! Read-only handlers over performance records and summaries.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/school-performance` | `?academicYearId&termId`, best ranking first |
//! | `GET`  | `/school-performance/{schoolId}` | Same scope params; 404 if absent |
//! | `GET`  | `/student-performances` | `?schoolId`, `?subjectId` or `?all=true`, plus scope params |
//!
//! Without `academicYearId` every endpoint reads the active year. When no
//! year is active, lists are empty and single lookups are 404.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use edustat_core::{
  performance::{PerformanceRecord, SchoolPerformanceSummary, Scope},
  store::PerformanceStore,
};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

// ─── Scope params ────────────────────────────────────────────────────────────

/// Query parameters naming a scope. Kept as text so malformed ids produce a
/// readable 400 instead of a bare extractor rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeParams {
  pub academic_year_id: Option<String>,
  pub term_id:          Option<String>,
}

impl ScopeParams {
  /// The requested scope, falling back to the active year. `None` when no
  /// year was given and none is active.
  async fn resolve<S: PerformanceStore>(&self, store: &S) -> Result<Option<Scope>, ApiError> {
    let term_id = parse_id(self.term_id.as_deref(), "term ID")?;
    if let Some(year) = parse_id(self.academic_year_id.as_deref(), "academic year ID")? {
      return Ok(Some(Scope::new(year, term_id)));
    }
    let active = store.active_academic_year().await.map_err(ApiError::store)?;
    Ok(active.map(|year| Scope::new(year.id, term_id)))
  }
}

/// Parse an optional numeric id; blank counts as absent.
fn parse_id(raw: Option<&str>, what: &str) -> Result<Option<i64>, ApiError> {
  match raw.map(str::trim) {
    None | Some("") => Ok(None),
    Some(s) => s
      .parse()
      .map(Some)
      .map_err(|_| ApiError::BadRequest(format!("Invalid {what} format"))),
  }
}

// ─── Summaries ───────────────────────────────────────────────────────────────

/// `GET /school-performance`
pub async fn list_summaries<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ScopeParams>,
) -> Result<Json<Vec<SchoolPerformanceSummary>>, ApiError>
where
  S: PerformanceStore + 'static,
{
  let Some(scope) = params.resolve(state.store.as_ref()).await? else {
    return Ok(Json(Vec::new()));
  };
  let summaries = state.store.list_summaries(scope).await.map_err(ApiError::store)?;
  Ok(Json(summaries))
}

/// `GET /school-performance/{schoolId}`
pub async fn get_summary<S>(
  State(state): State<AppState<S>>,
  Path(school_id): Path<String>,
  Query(params): Query<ScopeParams>,
) -> Result<Json<SchoolPerformanceSummary>, ApiError>
where
  S: PerformanceStore + 'static,
{
  let school_id: i64 = school_id
    .trim()
    .parse()
    .map_err(|_| ApiError::BadRequest("Invalid school ID".into()))?;
  let not_found = || ApiError::NotFound("School performance summary not found".into());

  let scope = params.resolve(state.store.as_ref()).await?.ok_or_else(not_found)?;
  let summary = state
    .store
    .find_summary(school_id, scope)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(not_found)?;
  Ok(Json(summary))
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordParams {
  pub school_id:        Option<String>,
  pub subject_id:       Option<String>,
  pub all:              Option<String>,
  pub academic_year_id: Option<String>,
  pub term_id:          Option<String>,
}

enum RecordFilter {
  School(i64),
  Subject(i64),
  All,
}

impl RecordParams {
  fn filter(&self) -> Result<RecordFilter, ApiError> {
    if let Some(id) = parse_id(self.school_id.as_deref(), "school ID")? {
      return Ok(RecordFilter::School(id));
    }
    if let Some(id) = parse_id(self.subject_id.as_deref(), "subject ID")? {
      return Ok(RecordFilter::Subject(id));
    }
    if self.all.as_deref().is_some_and(|v| v.eq_ignore_ascii_case("true")) {
      return Ok(RecordFilter::All);
    }
    Err(ApiError::BadRequest("Either schoolId, subjectId, or all=true is required".into()))
  }

  fn scope(&self) -> ScopeParams {
    ScopeParams {
      academic_year_id: self.academic_year_id.clone(),
      term_id:          self.term_id.clone(),
    }
  }
}

/// `GET /student-performances`
pub async fn list_records<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<RecordParams>,
) -> Result<Json<Vec<PerformanceRecord>>, ApiError>
where
  S: PerformanceStore + 'static,
{
  let filter = params.filter()?;
  let store = state.store.as_ref();
  let Some(scope) = params.scope().resolve(store).await? else {
    return Ok(Json(Vec::new()));
  };

  let records = match filter {
    RecordFilter::School(id) => store.list_performance_records(id, scope).await,
    RecordFilter::Subject(id) => store.list_performance_records_by_subject(id, scope).await,
    RecordFilter::All => {
      let schools = store.list_schools().await.map_err(ApiError::store)?;
      let mut all = Vec::new();
      for school in schools {
        all.extend(
          store
            .list_performance_records(school.id, scope)
            .await
            .map_err(ApiError::store)?,
        );
      }
      Ok(all)
    }
  }
  .map_err(ApiError::store)?;
  Ok(Json(records))
}
