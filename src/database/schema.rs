//! Database schema definitions
//!
//! Provides SQL schema definitions that work with both DuckDB and PostgreSQL.
//! Uniqueness of file and row content is declared here, so the database is the
//! source of truth for deduplication.

use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use super::{DatabaseError, DatabaseResult};
use crate::models::{Ingest, IngestStatus};

/// Schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Database schema helper
pub struct DatabaseSchema;

impl DatabaseSchema {
    /// Get the initial schema creation SQL
    ///
    /// This SQL is compatible with both DuckDB and PostgreSQL. The
    /// `log_rows -> ingests` foreign key is added separately for PostgreSQL;
    /// DuckDB's foreign keys are limited around updates of referenced rows.
    pub fn create_tables_sql() -> &'static str {
        r#"
-- One row per distinct file content
CREATE TABLE IF NOT EXISTS ingests (
    id UUID PRIMARY KEY,
    file_hash TEXT NOT NULL UNIQUE,
    file_name TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TIMESTAMP NOT NULL,
    total_rows BIGINT NOT NULL DEFAULT 0,
    inserted_rows BIGINT NOT NULL DEFAULT 0
);

CREATE SEQUENCE IF NOT EXISTS log_rows_id_seq;

-- One row per distinct log line content
CREATE TABLE IF NOT EXISTS log_rows (
    id BIGINT PRIMARY KEY DEFAULT nextval('log_rows_id_seq'),
    ingest_id UUID NOT NULL,
    "timestamp" TEXT NOT NULL,
    module TEXT NOT NULL,
    level TEXT NOT NULL,
    message TEXT NOT NULL,
    row_hash TEXT NOT NULL UNIQUE
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#
    }

    /// Get index creation SQL for performance optimization
    pub fn create_indexes_sql() -> &'static str {
        r#"
CREATE INDEX IF NOT EXISTS idx_log_rows_ingest ON log_rows(ingest_id);
CREATE INDEX IF NOT EXISTS idx_log_rows_timestamp ON log_rows("timestamp");
CREATE INDEX IF NOT EXISTS idx_log_rows_module ON log_rows(module);
CREATE INDEX IF NOT EXISTS idx_log_rows_level ON log_rows(level);
CREATE INDEX IF NOT EXISTS idx_ingests_created ON ingests(created_at);
"#
    }

    /// Foreign key from log rows to their ingest (PostgreSQL only)
    #[cfg(feature = "postgres-backend")]
    pub fn postgres_constraints_sql() -> &'static str {
        r#"
DO $$
BEGIN
    IF NOT EXISTS (
        SELECT 1 FROM pg_constraint WHERE conname = 'fk_log_rows_ingest'
    ) THEN
        ALTER TABLE log_rows
            ADD CONSTRAINT fk_log_rows_ingest FOREIGN KEY (ingest_id) REFERENCES ingests(id);
    END IF;
END
$$;
"#
    }

    /// Check current schema version
    pub fn check_schema_version_sql() -> &'static str {
        "SELECT MAX(version) as version FROM schema_version"
    }
}

/// Column list shared by ingest SELECTs
///
/// `created_at` is read back as text so both backends return the same shape.
pub const INGEST_COLUMNS: &str = "CAST(id AS VARCHAR) AS id, file_hash, file_name, status, \
     CAST(created_at AS VARCHAR) AS created_at, total_rows, inserted_rows";

/// Column list shared by log row SELECTs
pub const LOG_ROW_COLUMNS: &str =
    "CAST(ingest_id AS VARCHAR) AS ingest_id, \"timestamp\", level, module, message, row_hash";

/// Timestamp format used when writing and reading `created_at`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// An ingest row as selected with [`INGEST_COLUMNS`]
#[derive(Debug, Clone)]
pub(crate) struct IngestRecord {
    pub id: String,
    pub file_hash: String,
    pub file_name: Option<String>,
    pub status: String,
    pub created_at: String,
    pub total_rows: i64,
    pub inserted_rows: i64,
}

impl IngestRecord {
    pub fn into_ingest(self) -> DatabaseResult<Ingest> {
        let id = Uuid::parse_str(&self.id).map_err(|e| {
            DatabaseError::SerializationError(format!("Invalid ingest id '{}': {}", self.id, e))
        })?;
        let status: IngestStatus = self
            .status
            .parse()
            .map_err(DatabaseError::SerializationError)?;
        let created_at = NaiveDateTime::parse_from_str(&self.created_at, TIMESTAMP_FORMAT)
            .map_err(|e| {
                DatabaseError::SerializationError(format!(
                    "Invalid created_at '{}': {}",
                    self.created_at, e
                ))
            })?
            .and_utc();

        Ok(Ingest {
            id,
            file_hash: self.file_hash,
            file_name: self.file_name,
            status,
            created_at,
            total_rows: self.total_rows.max(0) as u64,
            inserted_rows: self.inserted_rows.max(0) as u64,
        })
    }
}

/// Format `created_at` for binding as a TIMESTAMP parameter
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}
