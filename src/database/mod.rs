//! Storage backends for ingested logs
//!
//! This module provides the storage abstraction the ingestion pipeline writes to:
//! - Memory: in-process store for tests and dry runs
//! - DuckDB: embedded database for the CLI
//! - PostgreSQL: pooled connections for shared deployments
//!
//! Every backend enforces `file_hash` and `row_hash` uniqueness itself, so
//! concurrent ingestions of the same content stay consistent without an
//! application-level lock.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Ingest, LogRow};

// Re-export implementations based on features
#[cfg(feature = "duckdb-backend")]
pub mod duckdb;

#[cfg(feature = "postgres-backend")]
pub mod postgres;

pub mod config;
pub mod memory;
pub mod schema;

#[cfg(feature = "duckdb-backend")]
pub use self::duckdb::DuckDBBackend;

#[cfg(feature = "postgres-backend")]
pub use self::postgres::PostgresBackend;

pub use config::DatabaseConfig;
pub use memory::MemoryStore;
pub use schema::DatabaseSchema;

/// Error type for database operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Transaction failed
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Database not initialized
    #[error("Database not initialized. Run 'db init' first.")]
    NotInitialized,

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),
}

/// Result type for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Query result row as a JSON value
pub type QueryRow = serde_json::Value;

/// Query result set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    /// Rows of data
    pub rows: Vec<QueryRow>,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create a new query result
    pub fn new(columns: Vec<String>, rows: Vec<QueryRow>) -> Self {
        Self {
            columns,
            rows,
            execution_time_ms: 0,
        }
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Storage collaborator for the ingestion pipeline
///
/// Implementations must enforce uniqueness of `ingests.file_hash` and
/// `log_rows.row_hash` themselves; callers never rely on a prior lookup
/// to keep those invariants.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Initialize storage (create tables and indexes if they don't exist)
    async fn initialize(&self) -> DatabaseResult<()>;

    /// Look up an ingest by the digest of its file content
    async fn find_ingest_by_hash(&self, file_hash: &str) -> DatabaseResult<Option<Ingest>>;

    /// Look up an ingest by id
    async fn get_ingest(&self, ingest_id: Uuid) -> DatabaseResult<Option<Ingest>>;

    /// Insert a new ingest row
    ///
    /// # Returns
    /// `false` if an ingest with the same `file_hash` already exists. A
    /// uniqueness conflict is never reported as an error.
    async fn create_ingest(&self, ingest: &Ingest) -> DatabaseResult<bool>;

    /// Insert log rows, silently skipping any whose `row_hash` is already stored
    ///
    /// Repeats inside `rows` are skipped the same way.
    ///
    /// # Returns
    /// Number of rows actually written
    async fn insert_log_rows(&self, rows: &[LogRow]) -> DatabaseResult<usize>;

    /// Mark an ingest complete and record its final counts
    async fn complete_ingest(
        &self,
        ingest_id: Uuid,
        total_rows: u64,
        inserted_rows: u64,
    ) -> DatabaseResult<()>;

    /// Most recent ingests, newest first
    async fn recent_ingests(&self, limit: usize) -> DatabaseResult<Vec<Ingest>>;

    /// Rows written by one ingest, in the order the store wrote them
    ///
    /// Memory and DuckDB keep file order; PostgreSQL writes each batch
    /// sorted by `row_hash`.
    async fn log_rows_for_ingest(&self, ingest_id: Uuid) -> DatabaseResult<Vec<LogRow>>;

    /// Total number of stored log rows
    async fn count_log_rows(&self) -> DatabaseResult<u64>;

    /// Check if storage is healthy and accessible
    async fn health_check(&self) -> DatabaseResult<bool>;

    /// Backend type name ("memory", "duckdb" or "postgres")
    fn backend_type(&self) -> &'static str;

    /// Close the storage connection
    async fn close(&self) -> DatabaseResult<()>;
}

/// Output format for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Format query results for display
pub fn format_query_result(result: &QueryResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&result.rows).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Csv => format_as_csv(result),
        OutputFormat::Table => format_as_table(result),
    }
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn format_as_csv(result: &QueryResult) -> String {
    let mut output = String::new();

    output.push_str(&result.columns.join(","));
    output.push('\n');

    for row in &result.rows {
        let values: Vec<String> = result
            .columns
            .iter()
            .map(|col| match row.get(col).unwrap_or(&serde_json::Value::Null) {
                // Log messages routinely contain commas and quotes
                serde_json::Value::String(s) => {
                    if s.contains(',') || s.contains('"') || s.contains('\n') {
                        format!("\"{}\"", s.replace('"', "\"\""))
                    } else {
                        s.clone()
                    }
                }
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect();
        output.push_str(&values.join(","));
        output.push('\n');
    }

    output
}

fn format_as_table(result: &QueryResult) -> String {
    if result.is_empty() {
        return "(0 rows)".to_string();
    }

    // Widths count chars, which is also what `{:width$}` pads by
    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.chars().count()).collect();
    for row in &result.rows {
        for (i, col) in result.columns.iter().enumerate() {
            let value = row.get(col).unwrap_or(&serde_json::Value::Null);
            widths[i] = widths[i].max(cell_text(value).chars().count());
        }
    }

    let mut output = String::new();

    let header: Vec<String> = result
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{:width$}", c, width = widths[i]))
        .collect();
    output.push_str(&header.join(" | "));
    output.push('\n');

    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    output.push_str(&separator.join("-+-"));
    output.push('\n');

    for row in &result.rows {
        let values: Vec<String> = result
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let value = row.get(col).unwrap_or(&serde_json::Value::Null);
                format!("{:width$}", cell_text(value), width = widths[i])
            })
            .collect();
        output.push_str(&values.join(" | "));
        output.push('\n');
    }

    output.push_str(&format!("({} rows)", result.row_count()));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(
            OutputFormat::from_str("table").unwrap(),
            OutputFormat::Table
        );
        assert_eq!(OutputFormat::from_str("json").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("csv").unwrap(), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
        assert!(OutputFormat::from_str("unknown").is_err());
    }

    #[test]
    fn test_query_result_empty() {
        let result = QueryResult::new(Vec::new(), Vec::new());
        assert!(result.is_empty());
        assert_eq!(result.row_count(), 0);
        assert_eq!(format_query_result(&result, OutputFormat::Table), "(0 rows)");
    }

    #[test]
    fn test_format_as_table() {
        let result = QueryResult::new(
            vec!["level".to_string(), "count".to_string()],
            vec![
                serde_json::json!({"level": "INFO", "count": 10}),
                serde_json::json!({"level": "ERROR", "count": 2}),
            ],
        );

        let output = format_as_table(&result);
        assert!(output.contains("level"));
        assert!(output.contains("count"));
        assert!(output.contains("ERROR"));
        assert!(output.contains("(2 rows)"));
    }

    #[test]
    fn test_format_as_table_widths_count_chars() {
        let result = QueryResult::new(
            vec!["module".to_string(), "message".to_string()],
            vec![
                serde_json::json!({"module": "zürich", "message": "größe überschritten"}),
                serde_json::json!({"module": "api", "message": "ok"}),
            ],
        );

        let output = format_as_table(&result);
        let lines: Vec<&str> = output.lines().collect();
        // Columns are as wide as their widest value in chars, not bytes
        assert_eq!(lines[1], format!("{}-+-{}", "-".repeat(6), "-".repeat(19)));
        let widths: Vec<usize> = lines[..4].iter().map(|l| l.chars().count()).collect();
        assert!(widths.iter().all(|w| *w == 6 + 3 + 19), "{}", output);
    }

    #[test]
    fn test_format_as_csv() {
        let result = QueryResult::new(
            vec!["module".to_string(), "message".to_string()],
            vec![
                serde_json::json!({"module": "api", "message": "simple"}),
                serde_json::json!({"module": "db", "message": "retry 1, giving up"}),
                serde_json::json!({"module": "auth", "message": null}),
            ],
        );

        let output = format_as_csv(&result);
        assert!(output.contains("module,message"));
        assert!(output.contains("api,simple"));
        assert!(output.contains("\"retry 1, giving up\""));
        assert!(output.contains("auth,\n"));
    }

    #[test]
    fn test_format_as_json() {
        let result = QueryResult::new(
            vec!["n".to_string()],
            vec![serde_json::json!({"n": 1})],
        );
        let output = format_query_result(&result, OutputFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["n"], 1);
    }
}
