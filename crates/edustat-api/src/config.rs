//! Server configuration, deserialised from `config.toml` and `EDUSTAT_*`
//! environment variables.

use std::path::PathBuf;

use edustat_ingest::{IngestOptions, RowErrorPolicy, ingest::DEFAULT_MAX_UPLOAD_BYTES};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:             String,
  #[serde(default = "default_port")]
  pub port:             u16,
  #[serde(default = "default_store_path")]
  pub store_path:       PathBuf,
  #[serde(default = "default_upload_dir")]
  pub upload_dir:       PathBuf,
  #[serde(default = "default_max_upload_bytes")]
  pub max_upload_bytes: u64,
  #[serde(default)]
  pub row_errors:       RowErrorPolicy,
  #[serde(default)]
  pub dedupe_uploads:   bool,
}

impl ServerConfig {
  pub fn ingest_options(&self) -> IngestOptions {
    IngestOptions {
      upload_dir:       self.upload_dir.clone(),
      max_upload_bytes: self.max_upload_bytes,
      row_errors:       self.row_errors,
      dedupe_uploads:   self.dedupe_uploads,
    }
  }
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 5000 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/edustat/edustat.db") }

fn default_upload_dir() -> PathBuf { std::env::temp_dir().join("edustat-uploads") }

fn default_max_upload_bytes() -> u64 { DEFAULT_MAX_UPLOAD_BYTES }
