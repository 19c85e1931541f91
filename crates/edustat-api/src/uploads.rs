//! Handlers for file uploads and the upload ledger.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/upload` | multipart: `file`, `academicYearId`, optional `termId` |
//! | `GET`  | `/file-uploads` | Newest first |

use axum::{
  Json,
  extract::{Multipart, State},
};
use edustat_core::{performance::Scope, store::PerformanceStore, upload::FileUpload};
use serde_json::{Value, json};

use crate::{AppState, error::ApiError};

/// `GET /file-uploads`
pub async fn list<S>(State(state): State<AppState<S>>) -> Result<Json<Vec<FileUpload>>, ApiError>
where
  S: PerformanceStore + 'static,
{
  let uploads = state.store.list_uploads().await.map_err(ApiError::store)?;
  Ok(Json(uploads))
}

// ─── Upload ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct UploadForm {
  file:             Option<(String, Vec<u8>)>,
  academic_year_id: Option<String>,
  term_id:          Option<String>,
}

impl UploadForm {
  async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
    let bad = |e: axum::extract::multipart::MultipartError| ApiError::BadRequest(e.body_text());
    let mut form = Self::default();
    while let Some(field) = multipart.next_field().await.map_err(bad)? {
      let name = field.name().map(str::to_owned);
      match name.as_deref() {
        Some("file") => {
          let filename = field.file_name().unwrap_or_default().to_owned();
          let data = field.bytes().await.map_err(bad)?;
          form.file = Some((filename, data.to_vec()));
        }
        Some("academicYearId") => form.academic_year_id = Some(field.text().await.map_err(bad)?),
        Some("termId") => form.term_id = Some(field.text().await.map_err(bad)?),
        _ => {}
      }
    }
    Ok(form)
  }

  fn scope(&self) -> Result<Scope, ApiError> {
    let academic_year_id = self
      .academic_year_id
      .as_deref()
      .and_then(|s| s.trim().parse().ok())
      .ok_or_else(|| ApiError::BadRequest("Invalid academic year ID".into()))?;
    let term_id = match self.term_id.as_deref().map(str::trim) {
      None | Some("") => None,
      Some(s) => Some(s.parse().map_err(|_| ApiError::BadRequest("Invalid term ID".into()))?),
    };
    Ok(Scope::new(academic_year_id, term_id))
  }
}

/// `POST /upload`
///
/// Responds with the upload row, the number of records and summaries written,
/// and any rows skipped under the lenient row policy.
pub async fn upload<S>(
  State(state): State<AppState<S>>,
  multipart: Multipart,
) -> Result<Json<Value>, ApiError>
where
  S: PerformanceStore + 'static,
{
  let form = UploadForm::read(multipart).await?;
  let Some((filename, data)) = form.file.as_ref().filter(|(name, _)| !name.is_empty()) else {
    return Err(ApiError::BadRequest("No file uploaded".into()));
  };
  let scope = form.scope()?;

  let report = state.ingestor.ingest(filename, data, scope).await?;
  Ok(Json(json!({
    "message": "File processed successfully",
    "fileUpload": report.upload,
    "records": report.records,
    "summaries": report.summaries,
    "warnings": report.warnings,
  })))
}
