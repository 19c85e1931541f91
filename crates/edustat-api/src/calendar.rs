//! Handlers for academic years and terms.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/academic-years` | |
//! | `POST` | `/academic-years` | Body: `{"name":"2024-2025","active":true}` |
//! | `GET`  | `/academic-years/active` | 404 when no year is active |
//! | `GET`  | `/terms/{academicYearId}` | |
//! | `POST` | `/terms` | Body: `{"name":"Term 1","academicYearId":1}`; 404 for an unknown year |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use edustat_core::{
  calendar::{AcademicYear, NewAcademicYear, NewTerm, Term},
  entity::names_match,
  store::PerformanceStore,
};
use tracing::info;

use crate::{AppState, error::ApiError};

// ─── Academic years ──────────────────────────────────────────────────────────

/// `GET /academic-years`
pub async fn list_years<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<AcademicYear>>, ApiError>
where
  S: PerformanceStore + 'static,
{
  let years = state.store.list_academic_years().await.map_err(ApiError::store)?;
  Ok(Json(years))
}

/// `POST /academic-years`
pub async fn create_year<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<NewAcademicYear>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PerformanceStore + 'static,
{
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("Invalid academic year data".into()));
  }
  let existing = state.store.list_academic_years().await.map_err(ApiError::store)?;
  if existing.iter().any(|y| names_match(&y.name, &body.name)) {
    return Err(ApiError::Conflict(format!("Academic year \"{}\" already exists", body.name)));
  }

  let year = state.store.create_academic_year(body).await.map_err(ApiError::store)?;
  info!(year = year.id, name = %year.name, active = year.active, "created academic year");
  Ok((StatusCode::CREATED, Json(year)))
}

/// `GET /academic-years/active`
pub async fn active_year<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<AcademicYear>, ApiError>
where
  S: PerformanceStore + 'static,
{
  let year = state
    .store
    .active_academic_year()
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("No active academic year found".into()))?;
  Ok(Json(year))
}

// ─── Terms ───────────────────────────────────────────────────────────────────

/// `GET /terms/{academicYearId}`
pub async fn list_terms<S>(
  State(state): State<AppState<S>>,
  Path(academic_year_id): Path<String>,
) -> Result<Json<Vec<Term>>, ApiError>
where
  S: PerformanceStore + 'static,
{
  let academic_year_id: i64 = academic_year_id
    .trim()
    .parse()
    .map_err(|_| ApiError::BadRequest("Invalid academic year ID".into()))?;
  let terms = state.store.list_terms(academic_year_id).await.map_err(ApiError::store)?;
  Ok(Json(terms))
}

/// `POST /terms`
pub async fn create_term<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<NewTerm>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PerformanceStore + 'static,
{
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("Invalid term data".into()));
  }
  state
    .store
    .get_academic_year(body.academic_year_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("Academic year not found".into()))?;

  let term = state.store.create_term(body).await.map_err(ApiError::store)?;
  info!(term = term.id, year = term.academic_year_id, "created term");
  Ok((StatusCode::CREATED, Json(term)))
}
