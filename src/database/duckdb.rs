//! DuckDB database backend implementation
//!
//! Provides an embedded database backend using DuckDB for storing and
//! querying ingested log files.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::schema::{
    DatabaseSchema, INGEST_COLUMNS, IngestRecord, LOG_ROW_COLUMNS, SCHEMA_VERSION,
    format_timestamp,
};
use super::{DatabaseError, DatabaseResult, LogStore, QueryResult};
use crate::models::{Ingest, LogRow};

/// DuckDB database backend
///
/// Supports both file-based persistence and in-memory mode.
pub struct DuckDBBackend {
    /// Path to the database file (None for in-memory)
    db_path: Option<PathBuf>,
    /// DuckDB connection (wrapped in Mutex for thread safety)
    connection: Mutex<duckdb::Connection>,
}

impl DuckDBBackend {
    /// Create a new DuckDB backend with a file-based database
    ///
    /// # Arguments
    /// * `db_path` - Path to the DuckDB database file
    pub fn new(db_path: impl AsRef<Path>) -> DatabaseResult<Self> {
        let path = db_path.as_ref().to_path_buf();
        let connection = duckdb::Connection::open(&path).map_err(|e| {
            DatabaseError::ConnectionFailed(format!("Failed to open DuckDB: {}", e))
        })?;

        tracing::debug!(path = %path.display(), "opened DuckDB database");

        Ok(Self {
            db_path: Some(path),
            connection: Mutex::new(connection),
        })
    }

    /// Create an in-memory DuckDB backend
    ///
    /// Useful for testing or dry runs where persistence is not needed.
    pub fn in_memory() -> DatabaseResult<Self> {
        let connection = duckdb::Connection::open_in_memory().map_err(|e| {
            DatabaseError::ConnectionFailed(format!("Failed to create in-memory DuckDB: {}", e))
        })?;

        Ok(Self {
            db_path: None,
            connection: Mutex::new(connection),
        })
    }

    /// Get the database file path (None for in-memory)
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Check if this is an in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.db_path.is_none()
    }

    fn lock(&self) -> DatabaseResult<MutexGuard<'_, duckdb::Connection>> {
        self.connection
            .lock()
            .map_err(|e| DatabaseError::ConnectionFailed(format!("Lock error: {}", e)))
    }

    /// Execute multiple SQL statements
    fn execute_batch(&self, sql: &str) -> DatabaseResult<()> {
        self.lock()?
            .execute_batch(sql)
            .map_err(|e| DatabaseError::QueryFailed(format!("Batch execute failed: {}", e)))
    }

    /// Run an arbitrary read query and return the rows as JSON objects
    pub fn execute_query(&self, sql: &str) -> DatabaseResult<QueryResult> {
        let start = std::time::Instant::now();
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| DatabaseError::QueryFailed(format!("Prepare failed: {}", e)))?;

        // In DuckDB 1.4+, column metadata is only available after execution
        let mut result_rows = stmt
            .query([])
            .map_err(|e| DatabaseError::QueryFailed(format!("Query failed: {}", e)))?;

        let column_count = result_rows.as_ref().map(|r| r.column_count()).unwrap_or(0);
        let columns: Vec<String> = (0..column_count)
            .map(|i| {
                result_rows
                    .as_ref()
                    .and_then(|r| r.column_name(i).ok())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("col{}", i))
            })
            .collect();

        let mut rows = Vec::new();
        while let Some(row) = result_rows
            .next()
            .map_err(|e| DatabaseError::QueryFailed(format!("Row fetch error: {}", e)))?
        {
            rows.push(Self::row_to_json(row, &columns));
        }

        Ok(QueryResult {
            columns,
            rows,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Convert a DuckDB row to a JSON value
    fn row_to_json(row: &duckdb::Row, columns: &[String]) -> serde_json::Value {
        let mut map = serde_json::Map::new();

        for (i, col_name) in columns.iter().enumerate() {
            let value = match row.get_ref(i) {
                Ok(value_ref) => Self::value_ref_to_json(value_ref),
                Err(_) => serde_json::Value::Null,
            };
            map.insert(col_name.clone(), value);
        }

        serde_json::Value::Object(map)
    }

    /// Convert a DuckDB ValueRef to a JSON value
    fn value_ref_to_json(value: duckdb::types::ValueRef) -> serde_json::Value {
        use duckdb::types::ValueRef;

        match value {
            ValueRef::Null => serde_json::Value::Null,
            ValueRef::Boolean(b) => serde_json::Value::Bool(b),
            ValueRef::TinyInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::SmallInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::Int(i) => serde_json::Value::Number(i.into()),
            ValueRef::BigInt(i) => serde_json::Value::Number(i.into()),
            // i128 may not fit in a JSON number
            ValueRef::HugeInt(i) => serde_json::Value::String(i.to_string()),
            ValueRef::UTinyInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::USmallInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::UInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::UBigInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ValueRef::Double(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned().into(),
            ValueRef::Blob(bytes) => {
                use base64::Engine;
                serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            ValueRef::Decimal(d) => serde_json::Value::String(d.to_string()),
            // Temporal and nested types are shown in their debug form; cast
            // them to VARCHAR in the query for a cleaner rendering
            other => serde_json::Value::String(format!("{:?}", other)),
        }
    }

    fn read_ingest(
        conn: &duckdb::Connection,
        where_clause: &str,
        param: &str,
    ) -> DatabaseResult<Option<Ingest>> {
        let sql = format!(
            "SELECT {} FROM ingests WHERE {} LIMIT 1",
            INGEST_COLUMNS, where_clause
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| DatabaseError::QueryFailed(format!("Prepare failed: {}", e)))?;

        let mut records = stmt
            .query_map([param], Self::map_ingest_record)
            .map_err(|e| DatabaseError::QueryFailed(format!("Failed to read ingest: {}", e)))?;

        match records.next() {
            Some(record) => {
                let record = record.map_err(|e| {
                    DatabaseError::QueryFailed(format!("Failed to read ingest: {}", e))
                })?;
                Ok(Some(record.into_ingest()?))
            }
            None => Ok(None),
        }
    }

    fn map_ingest_record(row: &duckdb::Row) -> duckdb::Result<IngestRecord> {
        Ok(IngestRecord {
            id: row.get(0)?,
            file_hash: row.get(1)?,
            file_name: row.get(2)?,
            status: row.get(3)?,
            created_at: row.get(4)?,
            total_rows: row.get(5)?,
            inserted_rows: row.get(6)?,
        })
    }

    fn count_rows_for(conn: &duckdb::Connection, ingest_id: &str) -> DatabaseResult<i64> {
        conn.query_row(
            "SELECT COUNT(*) FROM log_rows WHERE ingest_id = CAST(? AS UUID)",
            [ingest_id],
            |row| row.get(0),
        )
        .map_err(|e| DatabaseError::QueryFailed(format!("Failed to count rows: {}", e)))
    }
}

#[async_trait]
impl LogStore for DuckDBBackend {
    async fn initialize(&self) -> DatabaseResult<()> {
        self.execute_batch(DatabaseSchema::create_tables_sql())?;
        self.execute_batch(DatabaseSchema::create_indexes_sql())?;

        self.lock()?
            .execute(
                "INSERT INTO schema_version (version) VALUES (?) ON CONFLICT (version) DO NOTHING",
                [SCHEMA_VERSION],
            )
            .map_err(|e| {
                DatabaseError::MigrationFailed(format!("Failed to record schema version: {}", e))
            })?;

        Ok(())
    }

    async fn find_ingest_by_hash(&self, file_hash: &str) -> DatabaseResult<Option<Ingest>> {
        let conn = self.lock()?;
        Self::read_ingest(&conn, "file_hash = ?", file_hash)
    }

    async fn get_ingest(&self, ingest_id: Uuid) -> DatabaseResult<Option<Ingest>> {
        let conn = self.lock()?;
        Self::read_ingest(&conn, "id = CAST(? AS UUID)", &ingest_id.to_string())
    }

    async fn create_ingest(&self, ingest: &Ingest) -> DatabaseResult<bool> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT INTO ingests (id, file_hash, file_name, status, created_at, total_rows, inserted_rows)
            VALUES (CAST(? AS UUID), ?, ?, ?, CAST(? AS TIMESTAMP), ?, ?)
            ON CONFLICT (file_hash) DO NOTHING
            "#,
            duckdb::params![
                ingest.id.to_string(),
                &ingest.file_hash,
                &ingest.file_name,
                ingest.status.to_string(),
                format_timestamp(&ingest.created_at),
                ingest.total_rows as i64,
                ingest.inserted_rows as i64,
            ],
        )
        .map_err(|e| DatabaseError::QueryFailed(format!("Failed to create ingest: {}", e)))?;

        // The stored row decides who won the file_hash
        let stored = Self::read_ingest(&conn, "file_hash = ?", &ingest.file_hash)?;
        Ok(stored.is_some_and(|existing| existing.id == ingest.id))
    }

    async fn insert_log_rows(&self, rows: &[LogRow]) -> DatabaseResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut conn = self.lock()?;
        let ingest_ids: BTreeSet<String> = rows.iter().map(|r| r.ingest_id.to_string()).collect();

        let before = ingest_ids
            .iter()
            .map(|id| Self::count_rows_for(&conn, id))
            .sum::<DatabaseResult<i64>>()?;

        let tx = conn.transaction().map_err(|e| {
            DatabaseError::TransactionFailed(format!("Failed to begin transaction: {}", e))
        })?;

        {
            let mut stmt = tx
                .prepare(
                    r#"
                    INSERT INTO log_rows (ingest_id, "timestamp", level, module, message, row_hash)
                    VALUES (CAST(? AS UUID), ?, ?, ?, ?, ?)
                    ON CONFLICT (row_hash) DO NOTHING
                    "#,
                )
                .map_err(|e| DatabaseError::QueryFailed(format!("Prepare failed: {}", e)))?;

            for row in rows {
                stmt.execute(duckdb::params![
                    row.ingest_id.to_string(),
                    &row.timestamp,
                    &row.level,
                    &row.module,
                    &row.message,
                    &row.row_hash,
                ])
                .map_err(|e| {
                    DatabaseError::QueryFailed(format!("Failed to insert log row: {}", e))
                })?;
            }
        }

        tx.commit().map_err(|e| {
            DatabaseError::TransactionFailed(format!("Failed to commit log rows: {}", e))
        })?;

        let after = ingest_ids
            .iter()
            .map(|id| Self::count_rows_for(&conn, id))
            .sum::<DatabaseResult<i64>>()?;

        Ok((after - before).max(0) as usize)
    }

    async fn complete_ingest(
        &self,
        ingest_id: Uuid,
        total_rows: u64,
        inserted_rows: u64,
    ) -> DatabaseResult<()> {
        let conn = self.lock()?;

        let updated = conn
            .execute(
                r#"
                UPDATE ingests
                SET status = 'complete', total_rows = ?, inserted_rows = ?
                WHERE id = CAST(? AS UUID)
                "#,
                duckdb::params![
                    total_rows as i64,
                    inserted_rows as i64,
                    ingest_id.to_string()
                ],
            )
            .map_err(|e| {
                DatabaseError::QueryFailed(format!("Failed to complete ingest: {}", e))
            })?;

        if updated == 0 {
            return Err(DatabaseError::QueryFailed(format!(
                "Ingest not found: {}",
                ingest_id
            )));
        }
        Ok(())
    }

    async fn recent_ingests(&self, limit: usize) -> DatabaseResult<Vec<Ingest>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM ingests ORDER BY created_at DESC LIMIT {}",
            INGEST_COLUMNS, limit
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| DatabaseError::QueryFailed(format!("Prepare failed: {}", e)))?;

        let records = stmt
            .query_map([], Self::map_ingest_record)
            .map_err(|e| DatabaseError::QueryFailed(format!("Failed to list ingests: {}", e)))?;

        records
            .map(|record| {
                record
                    .map_err(|e| DatabaseError::QueryFailed(format!("Failed to read ingest: {}", e)))?
                    .into_ingest()
            })
            .collect()
    }

    async fn log_rows_for_ingest(&self, ingest_id: Uuid) -> DatabaseResult<Vec<LogRow>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM log_rows WHERE ingest_id = CAST(? AS UUID) ORDER BY id",
            LOG_ROW_COLUMNS
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| DatabaseError::QueryFailed(format!("Prepare failed: {}", e)))?;

        let rows = stmt
            .query_map([ingest_id.to_string()], |row| {
                Ok(LogRow {
                    ingest_id,
                    timestamp: row.get(1)?,
                    level: row.get(2)?,
                    module: row.get(3)?,
                    message: row.get(4)?,
                    row_hash: row.get(5)?,
                })
            })
            .map_err(|e| DatabaseError::QueryFailed(format!("Failed to read log rows: {}", e)))?;

        rows.map(|r| {
            r.map_err(|e| DatabaseError::QueryFailed(format!("Failed to read log row: {}", e)))
        })
        .collect()
    }

    async fn count_log_rows(&self) -> DatabaseResult<u64> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM log_rows", [], |row| row.get(0))
            .map_err(|e| DatabaseError::QueryFailed(format!("Failed to count rows: {}", e)))?;
        Ok(count.max(0) as u64)
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        let result = self.execute_query("SELECT 1 AS healthy")?;
        Ok(!result.rows.is_empty())
    }

    fn backend_type(&self) -> &'static str {
        "duckdb"
    }

    async fn close(&self) -> DatabaseResult<()> {
        // DuckDB connection is closed when dropped
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IngestStatus;
    use crate::parser::parse_line;

    fn row(ingest_id: Uuid, line: &str) -> LogRow {
        LogRow::from_record(ingest_id, &parse_line(line).unwrap())
    }

    async fn initialized() -> DuckDBBackend {
        let backend = DuckDBBackend::in_memory().unwrap();
        backend.initialize().await.unwrap();
        backend
    }

    #[tokio::test]
    async fn test_in_memory_database() {
        let backend = DuckDBBackend::in_memory().unwrap();
        assert!(backend.is_in_memory());
        assert!(backend.db_path().is_none());
    }

    #[tokio::test]
    async fn test_initialize() {
        let backend = initialized().await;

        let result = backend
            .execute_query(
                "SELECT table_name FROM information_schema.tables WHERE table_schema = 'main' ORDER BY table_name",
            )
            .unwrap();
        let names: Vec<&str> = result
            .rows
            .iter()
            .filter_map(|r| r.get("table_name").and_then(|v| v.as_str()))
            .collect();
        assert!(names.contains(&"ingests"));
        assert!(names.contains(&"log_rows"));

        // Running it twice is harmless
        backend.initialize().await.unwrap();
    }

    #[tokio::test]
    async fn test_health_check() {
        let backend = DuckDBBackend::in_memory().unwrap();
        assert!(backend.health_check().await.unwrap());
        assert_eq!(backend.backend_type(), "duckdb");
    }

    #[tokio::test]
    async fn test_ingest_round_trip() {
        let backend = initialized().await;
        let ingest = Ingest::new("hash-a", Some("app.log".to_string()));

        assert!(backend.create_ingest(&ingest).await.unwrap());

        let loaded = backend.get_ingest(ingest.id).await.unwrap().unwrap();
        assert_eq!(loaded, ingest);

        let by_hash = backend.find_ingest_by_hash("hash-a").await.unwrap().unwrap();
        assert_eq!(by_hash.id, ingest.id);
        assert!(backend.find_ingest_by_hash("hash-b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_ingest_conflict() {
        let backend = initialized().await;
        let first = Ingest::new("hash-a", None);
        let second = Ingest::new("hash-a", None);

        assert!(backend.create_ingest(&first).await.unwrap());
        assert!(!backend.create_ingest(&second).await.unwrap());
        assert!(backend.get_ingest(second.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_log_rows_deduplicates() {
        let backend = initialized().await;
        let first = Ingest::new("hash-a", None);
        let second = Ingest::new("hash-b", None);
        backend.create_ingest(&first).await.unwrap();
        backend.create_ingest(&second).await.unwrap();

        let rows = vec![
            row(first.id, "t1 INFO api started"),
            row(first.id, "t2 ERROR db timeout, retrying"),
            row(first.id, "t1 INFO api started"),
        ];
        assert_eq!(backend.insert_log_rows(&rows).await.unwrap(), 2);

        // Same content under another ingest is dropped
        let overlap = vec![
            row(second.id, "t2 ERROR db timeout, retrying"),
            row(second.id, "t3 WARN api slow"),
        ];
        assert_eq!(backend.insert_log_rows(&overlap).await.unwrap(), 1);
        assert_eq!(backend.count_log_rows().await.unwrap(), 3);

        let stored = backend.log_rows_for_ingest(first.id).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].message, "started");
        assert_eq!(stored[1].message, "timeout, retrying");
    }

    #[tokio::test]
    async fn test_complete_ingest() {
        let backend = initialized().await;
        let ingest = Ingest::new("hash-a", None);
        backend.create_ingest(&ingest).await.unwrap();

        backend.complete_ingest(ingest.id, 10, 8).await.unwrap();

        let loaded = backend.get_ingest(ingest.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, IngestStatus::Complete);
        assert_eq!(loaded.total_rows, 10);
        assert_eq!(loaded.inserted_rows, 8);

        assert!(backend.complete_ingest(Uuid::new_v4(), 1, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_recent_ingests() {
        let backend = initialized().await;
        for i in 0..4 {
            backend
                .create_ingest(&Ingest::new(format!("hash-{}", i), None))
                .await
                .unwrap();
        }

        assert_eq!(backend.recent_ingests(2).await.unwrap().len(), 2);
        assert_eq!(backend.recent_ingests(10).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_execute_query_counts_levels() {
        let backend = initialized().await;
        let ingest = Ingest::new("hash-a", None);
        backend.create_ingest(&ingest).await.unwrap();
        backend
            .insert_log_rows(&[
                row(ingest.id, "t1 INFO api a"),
                row(ingest.id, "t2 INFO api b"),
                row(ingest.id, "t3 ERROR db c"),
            ])
            .await
            .unwrap();

        let result = backend
            .execute_query("SELECT level, COUNT(*) AS n FROM log_rows GROUP BY level ORDER BY level")
            .unwrap();
        assert_eq!(result.columns, vec!["level", "n"]);
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.rows[0]["level"], "ERROR");
        assert_eq!(result.rows[1]["n"], 2);
    }

    #[tokio::test]
    async fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs.duckdb");
        let ingest = Ingest::new("hash-a", None);

        {
            let backend = DuckDBBackend::new(&path).unwrap();
            backend.initialize().await.unwrap();
            backend.create_ingest(&ingest).await.unwrap();
        }

        let reopened = DuckDBBackend::new(&path).unwrap();
        assert_eq!(reopened.db_path(), Some(path.as_path()));
        assert!(reopened.get_ingest(ingest.id).await.unwrap().is_some());
    }
}
