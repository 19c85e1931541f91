//! JSON REST API for edustat.
//!
//! Exposes an axum [`Router`] backed by any
//! [`edustat_core::store::PerformanceStore`]. File uploads are handed to an
//! [`Ingestor`]; everything else is a thin layer over the store.
//!
//! # Mounting
//!
//! [`app`] nests [`api_router`] under `/api` and adds request tracing.

pub mod calendar;
pub mod config;
pub mod error;
pub mod performance;
pub mod schools;
pub mod subjects;
pub mod uploads;

use std::sync::Arc;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use edustat_core::store::PerformanceStore;
use edustat_ingest::{IngestOptions, Ingestor};
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;
pub use error::ApiError;

/// Room for the multipart framing around an upload at the size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:    Arc<S>,
  pub ingestor: Arc<Ingestor<S>>,
}

impl<S: PerformanceStore> AppState<S> {
  pub fn new(store: Arc<S>, options: IngestOptions) -> Self {
    let ingestor = Arc::new(Ingestor::new(store.clone(), options));
    Self { store, ingestor }
  }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), ingestor: self.ingestor.clone() }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Every API route, unprefixed.
pub fn api_router<S>(state: AppState<S>) -> Router
where
  S: PerformanceStore + 'static,
{
  let body_limit = usize::try_from(state.ingestor.options().max_upload_bytes)
    .unwrap_or(usize::MAX)
    .saturating_add(MULTIPART_OVERHEAD);

  Router::new()
    // Reference data
    .route("/schools", get(schools::list::<S>).post(schools::create::<S>))
    .route("/subjects", get(subjects::list::<S>).post(subjects::create::<S>))
    // Calendar
    .route("/academic-years", get(calendar::list_years::<S>).post(calendar::create_year::<S>))
    .route("/academic-years/active", get(calendar::active_year::<S>))
    .route("/terms", post(calendar::create_term::<S>))
    .route("/terms/{academic_year_id}", get(calendar::list_terms::<S>))
    // Performance
    .route("/school-performance", get(performance::list_summaries::<S>))
    .route("/school-performance/{school_id}", get(performance::get_summary::<S>))
    .route("/student-performances", get(performance::list_records::<S>))
    // Uploads
    .route("/upload", post(uploads::upload::<S>))
    .route("/file-uploads", get(uploads::list::<S>))
    .layer(DefaultBodyLimit::max(body_limit))
    .with_state(state)
}

/// The full application: [`api_router`] under `/api`, with request tracing.
pub fn app<S>(state: AppState<S>) -> Router
where
  S: PerformanceStore + 'static,
{
  Router::new()
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use edustat_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tempfile::TempDir;
  use tower::ServiceExt as _;

  use super::*;

  const BOUNDARY: &str = "edustat-test-boundary";

  async fn make_state() -> (AppState<SqliteStore>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open_in_memory().await.unwrap();
    let options = IngestOptions { upload_dir: dir.path().to_path_buf(), ..Default::default() };
    (AppState::new(Arc::new(store), options), dir)
  }

  async fn send(state: &AppState<SqliteStore>, req: Request<Body>) -> (StatusCode, Value) {
    let resp: Response = app(state.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
  }

  async fn get_json(state: &AppState<SqliteStore>, uri: &str) -> (StatusCode, Value) {
    send(state, Request::get(uri).body(Body::empty()).unwrap()).await
  }

  async fn post_json(state: &AppState<SqliteStore>, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::post(uri)
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap();
    send(state, req).await
  }

  /// Parts are `(name, filename, content)`.
  fn multipart(parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (name, filename, content) in parts {
      body.push_str(&format!("--{BOUNDARY}\r\n"));
      match filename {
        Some(f) => body.push_str(&format!(
          "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
           Content-Type: application/octet-stream\r\n\r\n"
        )),
        None => body.push_str(&format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")),
      }
      body.push_str(content);
      body.push_str("\r\n");
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::post("/api/upload")
      .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
      .body(Body::from(body))
      .unwrap()
  }

  const CSV: &str = "School,Subject,Average Score,Pass Rate\n\
                     Alpha School,Mathematics,85,90\n\
                     Beta School,Mathematics,70%,60%\n";

  async fn active_year(state: &AppState<SqliteStore>) -> i64 {
    let (status, year) = post_json(
      state,
      "/api/academic-years",
      json!({ "name": "2024-2025", "active": true }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    year["id"].as_i64().unwrap()
  }

  // ─── Reference data ────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_and_list_schools() {
    let (state, _dir) = make_state().await;
    let (status, school) = post_json(
      &state,
      "/api/schools",
      json!({ "name": "Alpha School", "location": "North", "type": "Private" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(school["type"], "Private");

    let (status, list) = get_json(&state, "/api/schools").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn duplicate_school_is_a_conflict() {
    let (state, _dir) = make_state().await;
    post_json(&state, "/api/schools", json!({ "name": "Alpha" })).await;
    let (status, body) = post_json(&state, "/api/schools", json!({ "name": "alpha" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].is_string());
  }

  #[tokio::test]
  async fn blank_school_name_is_rejected() {
    let (state, _dir) = make_state().await;
    let (status, body) = post_json(&state, "/api/schools", json!({ "name": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid school data");
  }

  #[tokio::test]
  async fn subject_code_is_synthesised_when_absent() {
    let (state, _dir) = make_state().await;
    let (status, subject) = post_json(&state, "/api/subjects", json!({ "name": "Physics" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(subject["code"], "PHYS");
  }

  // ─── Calendar ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn active_year_is_404_until_one_exists() {
    let (state, _dir) = make_state().await;
    let (status, body) = get_json(&state, "/api/academic-years/active").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No active academic year found");

    let id = active_year(&state).await;
    let (status, year) = get_json(&state, "/api/academic-years/active").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(year["id"], id);
  }

  #[tokio::test]
  async fn terms_are_listed_per_year() {
    let (state, _dir) = make_state().await;
    let year = active_year(&state).await;
    let (status, _) = post_json(
      &state,
      "/api/terms",
      json!({ "name": "Term 1", "academicYearId": year, "startDate": "2024-09-01" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, terms) = get_json(&state, &format!("/api/terms/{year}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(terms[0]["startDate"], "2024-09-01");

    let (status, body) = get_json(&state, "/api/terms/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid academic year ID");
  }

  // ─── Upload ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn upload_then_read_summaries() {
    let (state, _dir) = make_state().await;
    let year = active_year(&state).await;

    let (status, body) = send(
      &state,
      multipart(&[
        ("academicYearId", None, &year.to_string()),
        ("file", Some("results.csv"), CSV),
      ]),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "File processed successfully");
    assert_eq!(body["fileUpload"]["status"], "processed");
    assert_eq!(body["records"], 2);

    // No academicYearId: falls back to the active year.
    let (status, summaries) = get_json(&state, "/api/school-performance").await;
    assert_eq!(status, StatusCode::OK);
    let ranked: Vec<_> = summaries
      .as_array()
      .unwrap()
      .iter()
      .map(|s| (s["overallAverage"].as_i64().unwrap(), s["ranking"].as_i64().unwrap()))
      .collect();
    assert_eq!(ranked, vec![(85, 1), (70, 2)]);

    let school_id = summaries[0]["schoolId"].as_i64().unwrap();
    let (status, summary) = get_json(&state, &format!("/api/school-performance/{school_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["successRate"], 90);

    let (status, records) =
      get_json(&state, &format!("/api/student-performances?schoolId={school_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(records.as_array().unwrap().len(), 1);

    let (_, all) = get_json(&state, "/api/student-performances?all=true").await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, uploads) = get_json(&state, "/api/file-uploads").await;
    assert_eq!(uploads[0]["filename"], "results.csv");
  }

  #[tokio::test]
  async fn upload_without_file_is_rejected() {
    let (state, _dir) = make_state().await;
    let (status, body) = send(&state, multipart(&[("academicYearId", None, "1")])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No file uploaded");
  }

  #[tokio::test]
  async fn upload_with_bad_year_is_rejected() {
    let (state, _dir) = make_state().await;
    let (status, body) = send(
      &state,
      multipart(&[("academicYearId", None, "soon"), ("file", Some("results.csv"), CSV)]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid academic year ID");
  }

  #[tokio::test]
  async fn structural_failure_is_a_400_with_the_reason() {
    let (state, _dir) = make_state().await;
    let (status, body) = send(
      &state,
      multipart(&[
        ("academicYearId", None, "1"),
        ("file", Some("results.csv"), "School,Subject,Score\nA,M,1\n"),
      ]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing required headers: Pass Rate");

    let (_, uploads) = get_json(&state, "/api/file-uploads").await;
    assert_eq!(uploads[0]["status"], "error");
  }

  #[tokio::test]
  async fn unsupported_extension_is_a_400() {
    let (state, _dir) = make_state().await;
    let (status, _) = send(
      &state,
      multipart(&[("academicYearId", None, "1"), ("file", Some("notes.txt"), "hello")]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  // ─── Performance reads ─────────────────────────────────────────────────

  #[tokio::test]
  async fn summaries_without_any_year_are_empty() {
    let (state, _dir) = make_state().await;
    let (status, body) = get_json(&state, "/api/school-performance").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
  }

  #[tokio::test]
  async fn missing_summary_is_404() {
    let (state, _dir) = make_state().await;
    let (status, body) = get_json(&state, "/api/school-performance/7?academicYearId=1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "School performance summary not found");
  }

  #[tokio::test]
  async fn student_performances_need_a_filter() {
    let (state, _dir) = make_state().await;
    let (status, body) = get_json(&state, "/api/student-performances?academicYearId=1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Either schoolId, subjectId, or all=true is required");
  }

  #[tokio::test]
  async fn malformed_year_query_is_rejected() {
    let (state, _dir) = make_state().await;
    let (status, body) = get_json(&state, "/api/school-performance?academicYearId=x").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid academic year ID format");
  }
}
