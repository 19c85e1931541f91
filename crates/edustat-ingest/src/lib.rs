//! The edustat ingestion pipeline.
//!
//! Turns an uploaded spreadsheet or XML file into performance records and
//! refreshes the per-school summaries for the upload's scope:
//!
//! ```text
//! bytes ─► Sheet / xml::Element ─► RawRecord ─► NewPerformanceRecord
//!                                                   │
//!                                      aggregate ─► summaries
//!                                                   │
//!                          records and summaries in one transaction
//! ```
//!
//! Every step talks to storage through
//! [`PerformanceStore`](edustat_core::store::PerformanceStore); nothing here
//! knows which backend is in use.

pub mod aggregate;
pub mod entities;
pub mod error;
pub mod extract;
pub mod headers;
pub mod ingest;
pub mod normalize;
pub mod tabular;
pub mod xml;

pub use error::{IngestError, Result};
pub use extract::RowErrorPolicy;
pub use ingest::{FileKind, IngestOptions, IngestReport, Ingestor};

#[cfg(test)]
mod fixtures;
