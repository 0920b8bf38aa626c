//! Ingest models
//!
//! One [`Ingest`] exists per distinct file content. Its status moves
//! `processing -> complete`; an ingest left in `processing` marks a run that
//! failed after the ingest row was created.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of an ingest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    /// Created but no work started
    #[default]
    Pending,
    /// Rows are being written
    Processing,
    /// All rows written and counts recorded
    Complete,
}

impl std::str::FromStr for IngestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(IngestStatus::Pending),
            "processing" => Ok(IngestStatus::Processing),
            "complete" => Ok(IngestStatus::Complete),
            _ => Err(format!("Unknown ingest status: {}", s)),
        }
    }
}

impl std::fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestStatus::Pending => write!(f, "pending"),
            IngestStatus::Processing => write!(f, "processing"),
            IngestStatus::Complete => write!(f, "complete"),
        }
    }
}

/// One ingestion attempt for a distinct file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingest {
    /// Unique identifier
    pub id: Uuid,
    /// SHA256 of the whole file (unique across the store)
    pub file_hash: String,
    /// Original file name, for display only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub status: IngestStatus,
    pub created_at: DateTime<Utc>,
    /// Records parsed from the file
    pub total_rows: u64,
    /// Records actually written (duplicates excluded)
    pub inserted_rows: u64,
}

impl Ingest {
    /// Create a new ingest in `processing` state
    pub fn new(file_hash: impl Into<String>, file_name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_hash: file_hash.into(),
            file_name,
            status: IngestStatus::Processing,
            // Microsecond precision survives a round trip through either database
            created_at: Utc::now().trunc_subsecs(6),
            total_rows: 0,
            inserted_rows: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == IngestStatus::Complete
    }
}

/// Result of one pipeline invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub file_hash: String,
    pub ingest_id: Uuid,
    pub total_rows: u64,
    pub inserted_rows: u64,
    /// True when the file content had already been ingested
    pub skipped: bool,
    /// Status of the ingest this summary describes
    pub status: IngestStatus,
}

impl IngestSummary {
    /// Summary pointing at an ingest that already existed
    pub fn skipped(existing: &Ingest) -> Self {
        Self {
            file_hash: existing.file_hash.clone(),
            ingest_id: existing.id,
            total_rows: existing.total_rows,
            inserted_rows: existing.inserted_rows,
            skipped: true,
            status: existing.status,
        }
    }

    /// Rows that were not written because their content was already stored
    pub fn duplicate_rows(&self) -> u64 {
        self.total_rows.saturating_sub(self.inserted_rows)
    }
}

impl std::fmt::Display for IngestSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.skipped {
            write!(
                f,
                "Skipped: file already ingested as {} ({}, {} of {} rows inserted)",
                self.ingest_id, self.status, self.inserted_rows, self.total_rows
            )
        } else {
            write!(
                f,
                "Ingested {}: {} of {} rows inserted ({} duplicates)",
                self.ingest_id,
                self.inserted_rows,
                self.total_rows,
                self.duplicate_rows()
            )
        }
    }
}
