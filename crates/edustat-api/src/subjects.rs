//! Handlers for `/subjects` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/subjects` | Ascending id order |
//! | `POST` | `/subjects` | Body: `{"name":"…","code":"…"}`; code derived from the name when absent |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use edustat_core::{
  entity::{NewSubject, Subject, names_match, subject_code},
  store::PerformanceStore,
};
use tracing::info;

use crate::{AppState, error::ApiError};

/// `GET /subjects`
pub async fn list<S>(State(state): State<AppState<S>>) -> Result<Json<Vec<Subject>>, ApiError>
where
  S: PerformanceStore + 'static,
{
  let subjects = state.store.list_subjects().await.map_err(ApiError::store)?;
  Ok(Json(subjects))
}

/// `POST /subjects`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Json(mut body): Json<NewSubject>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PerformanceStore + 'static,
{
  body
    .validate()
    .map_err(|_| ApiError::BadRequest("Invalid subject data".into()))?;

  let existing = state.store.list_subjects().await.map_err(ApiError::store)?;
  if existing.iter().any(|s| names_match(&s.name, &body.name)) {
    return Err(ApiError::Conflict(format!("Subject \"{}\" already exists", body.name)));
  }

  if body.code.as_deref().is_none_or(|c| c.trim().is_empty()) {
    body.code = Some(subject_code(&body.name));
  }

  let subject = state.store.create_subject(body).await.map_err(ApiError::store)?;
  info!(subject = subject.id, name = %subject.name, "created subject");
  Ok((StatusCode::CREATED, Json(subject)))
}
