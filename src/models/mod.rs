//! Models module for the SDK
//!
//! Defines the persisted ingestion records and the summaries returned to callers.

pub mod ingest;
pub mod log_row;

pub use ingest::{Ingest, IngestStatus, IngestSummary};
pub use log_row::LogRow;
