//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use edustat_ingest::IngestError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler. Every variant renders as
/// `{"message": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  BadRequest(String),

  #[error("{0}")]
  Conflict(String),

  #[error("{0}")]
  PayloadTooLarge(String),

  /// A failure whose details are logged, not returned.
  #[error("{0}")]
  Internal(String),

  /// A storage failure. The cause is logged when the response is built.
  #[error("Internal server error")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(err))
  }
}

impl From<IngestError> for ApiError {
  fn from(err: IngestError) -> Self {
    match err {
      IngestError::TooLarge { .. } => Self::PayloadTooLarge(err.to_string()),
      IngestError::DuplicateUpload(_) => Self::Conflict(err.to_string()),
      err if err.is_rejection() => Self::BadRequest(err.to_string()),
      err => {
        tracing::error!(error = %err, "file upload failed");
        Self::Internal("Failed to process file upload".into())
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
      ApiError::Store(source) => {
        tracing::error!(error = %source, "store error");
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };
    (status, Json(json!({ "message": self.to_string() }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use edustat_core::performance::Scope;

  use super::*;

  #[test]
  fn ingest_errors_map_to_statuses() {
    let status = |e: IngestError| ApiError::from(e).into_response().status();
    assert_eq!(status(IngestError::TooLarge { size: 2, limit: 1 }), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(status(IngestError::DuplicateUpload(Scope::year(1))), StatusCode::CONFLICT);
    assert_eq!(status(IngestError::NoPerformanceData), StatusCode::BAD_REQUEST);
    assert_eq!(status(IngestError::Rows(vec!["Row 2: x".into()])), StatusCode::BAD_REQUEST);
    assert_eq!(
      status(IngestError::Io(std::io::Error::other("disk full"))),
      StatusCode::INTERNAL_SERVER_ERROR
    );
  }

  #[test]
  fn processing_failures_hide_their_cause() {
    let err = ApiError::from(IngestError::Io(std::io::Error::other("disk full")));
    assert_eq!(err.to_string(), "Failed to process file upload");
  }

  #[tokio::test]
  async fn store_failures_hide_backend_text() {
    let err = ApiError::store(std::io::Error::other("no such table: schools"));
    assert!(std::error::Error::source(&err).is_some());

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({ "message": "Internal server error" }));
  }
}
