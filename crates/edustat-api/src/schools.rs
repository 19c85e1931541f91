//! Handlers for `/schools` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/schools` | Ascending id order |
//! | `POST` | `/schools` | Body: `{"name":"…","location":"…","type":"Public"}`; 409 on a duplicate name |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use edustat_core::{
  entity::{NewSchool, School, names_match},
  store::PerformanceStore,
};
use tracing::info;

use crate::{AppState, error::ApiError};

/// `GET /schools`
pub async fn list<S>(State(state): State<AppState<S>>) -> Result<Json<Vec<School>>, ApiError>
where
  S: PerformanceStore + 'static,
{
  let schools = state.store.list_schools().await.map_err(ApiError::store)?;
  Ok(Json(schools))
}

/// `POST /schools`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<NewSchool>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PerformanceStore + 'static,
{
  body
    .validate()
    .map_err(|_| ApiError::BadRequest("Invalid school data".into()))?;

  let existing = state.store.list_schools().await.map_err(ApiError::store)?;
  if existing.iter().any(|s| names_match(&s.name, &body.name)) {
    return Err(ApiError::Conflict(format!("School \"{}\" already exists", body.name)));
  }

  let school = state.store.create_school(body).await.map_err(ApiError::store)?;
  info!(school = school.id, name = %school.name, "created school");
  Ok((StatusCode::CREATED, Json(school)))
}
