//! The per-upload pipeline.
//!
//! [`Ingestor::ingest`] runs one uploaded file end to end:
//!
//! 1. reject unknown extensions, oversized files and (optionally) repeats
//! 2. record the upload as `processing`
//! 3. stage the bytes in `upload_dir` and parse them
//! 4. extract records, creating unknown schools and subjects
//! 5. refresh every summary of the scope, then write records and summaries
//!    in one transaction
//! 6. mark the upload `processed`, or `error` if any step failed
//!
//! The staged file is removed on every exit path.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use edustat_core::{
  performance::Scope,
  store::PerformanceStore,
  upload::{FileUpload, NewUpload, UploadStatus},
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
  IngestError, Result,
  aggregate::recompute_summaries,
  entities::EntityCache,
  extract::{Extraction, RowErrorPolicy, extract},
  tabular, xml,
};

/// Largest accepted upload, in bytes.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

// ─── File kinds ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
  Xlsx,
  Xls,
  Ods,
  Csv,
  Xml,
}

impl FileKind {
  /// Detect the kind from the file extension, ignoring case.
  pub fn from_filename(filename: &str) -> Option<Self> {
    let ext = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
      "xlsx" => Some(Self::Xlsx),
      "xls" => Some(Self::Xls),
      "ods" => Some(Self::Ods),
      "csv" => Some(Self::Csv),
      "xml" => Some(Self::Xml),
      _ => None,
    }
  }
}

// ─── Options & report ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
  /// Where uploads are staged while they are parsed.
  pub upload_dir:       PathBuf,
  pub max_upload_bytes: u64,
  pub row_errors:       RowErrorPolicy,
  /// Reject a file whose content was already processed for the same scope.
  pub dedupe_uploads:   bool,
}

impl Default for IngestOptions {
  fn default() -> Self {
    Self {
      upload_dir:       std::env::temp_dir().join("edustat-uploads"),
      max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
      row_errors:       RowErrorPolicy::default(),
      dedupe_uploads:   false,
    }
  }
}

/// Result of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
  pub upload:    FileUpload,
  pub records:   usize,
  pub summaries: usize,
  /// Rows skipped under [`RowErrorPolicy::Lenient`].
  pub warnings:  Vec<String>,
}

// ─── Ingestor ────────────────────────────────────────────────────────────────

pub struct Ingestor<S> {
  store:   Arc<S>,
  options: IngestOptions,
}

impl<S: PerformanceStore> Ingestor<S> {
  pub fn new(store: Arc<S>, options: IngestOptions) -> Self { Self { store, options } }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn options(&self) -> &IngestOptions { &self.options }

  /// Ingest the uploaded file `filename` for `scope`.
  pub async fn ingest(&self, filename: &str, data: &[u8], scope: Scope) -> Result<IngestReport> {
    let kind = FileKind::from_filename(filename).ok_or_else(|| {
      warn!(filename, "rejected upload with unsupported extension");
      IngestError::UnsupportedFormat(filename.to_owned())
    })?;

    let size = data.len() as u64;
    let limit = self.options.max_upload_bytes;
    if size > limit {
      warn!(filename, size, limit, "rejected oversized upload");
      return Err(IngestError::TooLarge { size, limit });
    }

    let content_hash = hex::encode(Sha256::digest(data));
    if self.options.dedupe_uploads
      && self
        .store
        .has_processed_upload(&content_hash, scope)
        .await
        .map_err(IngestError::store)?
    {
      warn!(filename, %scope, "rejected duplicate upload");
      return Err(IngestError::DuplicateUpload(scope));
    }

    let upload = self
      .store
      .create_upload(NewUpload {
        filename: filename.to_owned(),
        file_size: size as i64,
        academic_year_id: scope.academic_year_id,
        term_id: scope.term_id,
        content_hash,
      })
      .await
      .map_err(IngestError::store)?;
    info!(upload = upload.id, filename, ?kind, %scope, "processing upload");

    match self.process(&upload, kind, data, scope).await {
      Ok(done) => {
        let upload = self
          .store
          .set_upload_status(upload.id, UploadStatus::Processed)
          .await
          .map_err(IngestError::store)?;
        info!(
          upload = upload.id,
          records = done.records,
          summaries = done.summaries,
          warnings = done.warnings.len(),
          "upload processed"
        );
        Ok(IngestReport {
          upload,
          records: done.records,
          summaries: done.summaries,
          warnings: done.warnings,
        })
      }
      Err(err) => {
        if err.is_rejection() {
          warn!(upload = upload.id, error = %err, "upload rejected");
        } else {
          error!(upload = upload.id, error = %err, "upload failed");
        }
        if let Err(e) = self.store.set_upload_status(upload.id, UploadStatus::Error).await {
          error!(upload = upload.id, error = %e, "failed to mark upload as errored");
        }
        Err(err)
      }
    }
  }

  async fn process(
    &self,
    upload: &FileUpload,
    kind: FileKind,
    data: &[u8],
    scope: Scope,
  ) -> Result<Processed> {
    let staged = StagedFile::write(&self.options.upload_dir, &upload.filename, data).await?;
    let store = self.store.as_ref();
    let mut cache = EntityCache::load(store).await.map_err(IngestError::store)?;

    let extraction: Extraction = match kind {
      FileKind::Xml => {
        let bytes = tokio::fs::read(staged.path()).await?;
        let doc = xml::parse_document(&bytes)?;
        extract(&doc, store, &mut cache, scope).await?
      }
      FileKind::Csv => {
        let sheet = read_blocking(staged.path(), tabular::read_csv).await?;
        extract(&sheet, store, &mut cache, scope).await?
      }
      FileKind::Xlsx | FileKind::Xls | FileKind::Ods => {
        let sheet = read_blocking(staged.path(), tabular::read_workbook).await?;
        extract(&sheet, store, &mut cache, scope).await?
      }
    };
    drop(staged);

    let (records, warnings) = extraction.finish(self.options.row_errors)?;
    let summaries = recompute_summaries(store, scope, &records)
      .await
      .map_err(IngestError::store)?;
    let commit = store
      .commit_ingestion(records, summaries)
      .await
      .map_err(IngestError::store)?;

    Ok(Processed {
      records: commit.record_ids.len(),
      summaries: commit.summary_ids.len(),
      warnings,
    })
  }
}

struct Processed {
  records:   usize,
  summaries: usize,
  warnings:  Vec<String>,
}

/// Run a synchronous file reader off the async runtime.
async fn read_blocking<T, F>(path: &Path, read: F) -> Result<T>
where
  T: Send + 'static,
  F: FnOnce(&Path) -> Result<T> + Send + 'static,
{
  let path = path.to_path_buf();
  tokio::task::spawn_blocking(move || read(&path))
    .await
    .map_err(|e| IngestError::Io(std::io::Error::other(e)))?
}

// ─── Staged file ─────────────────────────────────────────────────────────────

/// An upload written to disk, deleted again when dropped.
struct StagedFile {
  path: PathBuf,
}

impl StagedFile {
  async fn write(dir: &Path, filename: &str, data: &[u8]) -> Result<Self> {
    tokio::fs::create_dir_all(dir).await?;
    let staged = Self { path: dir.join(format!("{}-{}", Uuid::new_v4(), safe_name(filename))) };
    tokio::fs::write(&staged.path, data).await?;
    Ok(staged)
  }

  fn path(&self) -> &Path { &self.path }
}

impl Drop for StagedFile {
  fn drop(&mut self) {
    match std::fs::remove_file(&self.path) {
      Ok(()) => {}
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
      Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove staged upload"),
    }
  }
}

/// `filename` reduced to characters safe in a path component.
fn safe_name(filename: &str) -> String {
  filename
    .chars()
    .map(|c| if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
    .collect()
}
