//! Deduplicating ingestion pipeline
//!
//! Ingests one log file into a [`LogStore`]:
//!
//! 1. the whole file is hashed and looked up; a known file short-circuits
//!    before any parsing,
//! 2. an [`Ingest`] is created in `processing` state (a conflict on the file
//!    hash means another ingestion got there first),
//! 3. the file is parsed and every record hashed,
//! 4. rows are written with conflict-skip on the row hash,
//! 5. the ingest is marked `complete` with its counts.
//!
//! A failure in step 4 or 5 leaves the ingest in `processing`. Ingesting the
//! same bytes again then short-circuits at step 1.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::database::{DatabaseError, LogStore};
use crate::hash::file_digest;
use crate::models::{Ingest, IngestStatus, IngestSummary, LogRow};
use crate::parser::{ParsedLogSet, parse_bytes, with_source};
use crate::stats::{LogReport, aggregate};

/// Errors that can occur during ingestion
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The input could not be read; nothing was written
    #[error("Failed to read {source_name}: {error}")]
    SourceUnreadable {
        source_name: String,
        #[source]
        error: std::io::Error,
    },

    /// The store failed; an ingest may have been left in `processing`
    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

/// Result type for ingestion
pub type IngestResult<T> = Result<T, IngestError>;

/// Ingestion pipeline over a shared store
///
/// Cloning is cheap; clones share the same store and may run concurrently.
pub struct IngestPipeline<S> {
    store: Arc<S>,
}

impl<S> Clone for IngestPipeline<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LogStore> IngestPipeline<S> {
    pub fn new(store: S) -> Self {
        Self::from_arc(Arc::new(store))
    }

    pub fn from_arc(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Ingest raw file bytes
    ///
    /// # Arguments
    /// * `raw` - Complete file content; its digest is the file-level dedup key
    /// * `file_name` - Display name recorded on the ingest (not a dedup key)
    pub async fn ingest_bytes(
        &self,
        raw: &[u8],
        file_name: Option<&str>,
    ) -> IngestResult<IngestSummary> {
        self.run(raw, None, file_name).await
    }

    /// Ingest raw bytes the caller has already parsed
    ///
    /// `logs` must be the parse of `raw`. The file hash check still runs
    /// first, so a known file writes nothing.
    pub async fn ingest_parsed(
        &self,
        raw: &[u8],
        logs: &ParsedLogSet,
        file_name: Option<&str>,
    ) -> IngestResult<IngestSummary> {
        self.run(raw, Some(logs), file_name).await
    }

    /// Read a source to the end and ingest it
    pub async fn ingest_reader<R: Read>(
        &self,
        mut reader: R,
        file_name: Option<&str>,
    ) -> IngestResult<IngestSummary> {
        let mut raw = Vec::new();
        reader
            .read_to_end(&mut raw)
            .map_err(|error| IngestError::SourceUnreadable {
                source_name: file_name.unwrap_or("<reader>").to_string(),
                error,
            })?;
        self.ingest_bytes(&raw, file_name).await
    }

    /// Read a file from disk and ingest it under its file name
    pub async fn ingest_path(&self, path: &Path) -> IngestResult<IngestSummary> {
        let raw = std::fs::read(path).map_err(|error| IngestError::SourceUnreadable {
            source_name: path.display().to_string(),
            error,
        })?;
        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        self.ingest_bytes(&raw, file_name.as_deref()).await
    }

    async fn run(
        &self,
        raw: &[u8],
        parsed: Option<&ParsedLogSet>,
        file_name: Option<&str>,
    ) -> IngestResult<IngestSummary> {
        let file_hash = file_digest(raw);

        if let Some(existing) = self.store.find_ingest_by_hash(&file_hash).await? {
            if existing.is_complete() {
                tracing::warn!(
                    file_hash = %file_hash,
                    ingest_id = %existing.id,
                    "file already ingested, skipping"
                );
            } else {
                tracing::warn!(
                    file_hash = %file_hash,
                    ingest_id = %existing.id,
                    status = %existing.status,
                    "earlier ingest of this file never completed, skipping"
                );
            }
            return Ok(IngestSummary::skipped(&existing));
        }

        let ingest = Ingest::new(file_hash.clone(), file_name.map(str::to_string));
        if !self.store.create_ingest(&ingest).await? {
            return self.conflicting_ingest(&file_hash).await;
        }

        tracing::info!(
            file_hash = %file_hash,
            ingest_id = %ingest.id,
            file_name = file_name.unwrap_or("-"),
            "ingest started"
        );

        let parsed_here;
        let logs = match parsed {
            Some(logs) => logs,
            None => {
                parsed_here = parse_bytes(raw);
                &parsed_here
            }
        };

        let rows: Vec<LogRow> = logs
            .iter()
            .map(|record| LogRow::from_record(ingest.id, record))
            .collect();
        let total_rows = rows.len() as u64;

        let inserted_rows = match self.store.insert_log_rows(&rows).await {
            Ok(n) => n as u64,
            Err(e) => {
                tracing::error!(ingest_id = %ingest.id, error = %e, "failed to write log rows");
                return Err(e.into());
            }
        };

        if let Err(e) = self
            .store
            .complete_ingest(ingest.id, total_rows, inserted_rows)
            .await
        {
            tracing::error!(ingest_id = %ingest.id, error = %e, "failed to complete ingest");
            return Err(e.into());
        }

        tracing::info!(
            ingest_id = %ingest.id,
            total_rows,
            inserted_rows,
            "ingest complete"
        );

        Ok(IngestSummary {
            file_hash,
            ingest_id: ingest.id,
            total_rows,
            inserted_rows,
            skipped: false,
            status: IngestStatus::Complete,
        })
    }

    /// Resolve a lost race on ingest creation to the winner's summary
    async fn conflicting_ingest(&self, file_hash: &str) -> IngestResult<IngestSummary> {
        match self.store.find_ingest_by_hash(file_hash).await? {
            Some(existing) => {
                tracing::warn!(
                    file_hash = %file_hash,
                    ingest_id = %existing.id,
                    "concurrent ingestion of the same file, skipping"
                );
                Ok(IngestSummary::skipped(&existing))
            }
            None => Err(IngestError::Storage(DatabaseError::QueryFailed(format!(
                "Ingest for file {} conflicted but could not be read back",
                file_hash
            )))),
        }
    }
}

/// Statistics and ingestion result for one uploaded file
#[derive(Debug)]
pub struct UploadOutcome {
    /// Always computed, whether or not persistence succeeded
    pub report: LogReport,
    pub ingest: IngestResult<IngestSummary>,
}

impl UploadOutcome {
    pub fn summary(&self) -> Option<&IngestSummary> {
        self.ingest.as_ref().ok()
    }
}

/// Parse an uploaded file once, report on it and ingest it
///
/// A persistence failure is carried in [`UploadOutcome::ingest`]; it never
/// suppresses the report.
pub async fn process_upload<S: LogStore>(
    pipeline: &IngestPipeline<S>,
    raw: &[u8],
    file_name: Option<&str>,
) -> UploadOutcome {
    let mut logs = parse_bytes(raw);
    if let Some(name) = file_name {
        logs = with_source(logs, name);
    }

    let report = aggregate(&logs);
    let ingest = pipeline.ingest_parsed(raw, &logs, file_name).await;

    if let Err(e) = &ingest {
        tracing::error!(file_name = file_name.unwrap_or("-"), error = %e, "upload not persisted");
    }

    UploadOutcome { report, ingest }
}
