//! Store selection for CLI commands
//!
//! Commands work against whichever backend the workspace config names;
//! [`ConfiguredStore`] forwards [`LogStore`] calls to it.

use async_trait::async_trait;
use std::path::Path;
use uuid::Uuid;

use super::error::CliError;
use crate::database::config::{DatabaseBackendType, DatabaseConfig};
use crate::database::{DatabaseError, DatabaseResult, LogStore, MemoryStore, QueryResult};
#[cfg(feature = "duckdb-backend")]
use crate::database::DuckDBBackend;
#[cfg(feature = "postgres-backend")]
use crate::database::PostgresBackend;
use crate::models::{Ingest, LogRow};

/// The store a workspace is configured to use
pub enum ConfiguredStore {
    /// Throwaway store for dry runs
    Memory(MemoryStore),
    #[cfg(feature = "duckdb-backend")]
    DuckDB(DuckDBBackend),
    #[cfg(feature = "postgres-backend")]
    Postgres(PostgresBackend),
}

macro_rules! dispatch {
    ($self:expr, $store:ident => $body:expr) => {
        match $self {
            ConfiguredStore::Memory($store) => $body,
            #[cfg(feature = "duckdb-backend")]
            ConfiguredStore::DuckDB($store) => $body,
            #[cfg(feature = "postgres-backend")]
            ConfiguredStore::Postgres($store) => $body,
        }
    };
}

impl ConfiguredStore {
    /// Open the store described by `config` for the given workspace
    ///
    /// The workspace must have been set up with `db init`.
    pub async fn open(workspace: &Path, config: &DatabaseConfig) -> Result<Self, CliError> {
        if !DatabaseConfig::is_initialized(workspace) {
            return Err(CliError::DatabaseError(
                DatabaseError::NotInitialized.to_string(),
            ));
        }

        match config.database.backend {
            DatabaseBackendType::DuckDB => Self::open_duckdb(workspace, config),
            DatabaseBackendType::Postgres => Self::open_postgres(config).await,
        }
    }

    #[cfg(feature = "duckdb-backend")]
    fn open_duckdb(workspace: &Path, config: &DatabaseConfig) -> Result<Self, CliError> {
        let db_path = config.get_duckdb_path(workspace);
        let backend = DuckDBBackend::new(&db_path)
            .map_err(|e| CliError::DatabaseError(format!("Failed to open database: {}", e)))?;
        Ok(ConfiguredStore::DuckDB(backend))
    }

    #[cfg(not(feature = "duckdb-backend"))]
    fn open_duckdb(_workspace: &Path, _config: &DatabaseConfig) -> Result<Self, CliError> {
        Err(CliError::InvalidArgument(
            "DuckDB backend not enabled. Build with --features duckdb-backend".to_string(),
        ))
    }

    #[cfg(feature = "postgres-backend")]
    async fn open_postgres(config: &DatabaseConfig) -> Result<Self, CliError> {
        let conn_str = config.get_postgres_connection_string().ok_or_else(|| {
            CliError::InvalidArgument("PostgreSQL connection string not configured".to_string())
        })?;
        let backend = PostgresBackend::new(conn_str, config.postgres.pool_size)
            .await
            .map_err(|e| CliError::DatabaseError(format!("Failed to connect: {}", e)))?;
        Ok(ConfiguredStore::Postgres(backend))
    }

    #[cfg(not(feature = "postgres-backend"))]
    async fn open_postgres(_config: &DatabaseConfig) -> Result<Self, CliError> {
        Err(CliError::InvalidArgument(
            "PostgreSQL backend not enabled. Build with --features postgres-backend".to_string(),
        ))
    }

    /// Run an ad-hoc SQL query
    pub async fn execute_query(&self, sql: &str) -> Result<QueryResult, CliError> {
        let result: DatabaseResult<QueryResult> = match self {
            ConfiguredStore::Memory(_) => {
                return Err(CliError::InvalidArgument(
                    "SQL queries need a database backend".to_string(),
                ));
            }
            #[cfg(feature = "duckdb-backend")]
            ConfiguredStore::DuckDB(backend) => backend.execute_query(sql),
            #[cfg(feature = "postgres-backend")]
            ConfiguredStore::Postgres(backend) => backend.execute_query(sql).await,
        };
        result.map_err(|e| CliError::DatabaseError(format!("Query failed: {}", e)))
    }
}

#[async_trait]
impl LogStore for ConfiguredStore {
    async fn initialize(&self) -> DatabaseResult<()> {
        dispatch!(self, s => s.initialize().await)
    }

    async fn find_ingest_by_hash(&self, file_hash: &str) -> DatabaseResult<Option<Ingest>> {
        dispatch!(self, s => s.find_ingest_by_hash(file_hash).await)
    }

    async fn get_ingest(&self, ingest_id: Uuid) -> DatabaseResult<Option<Ingest>> {
        dispatch!(self, s => s.get_ingest(ingest_id).await)
    }

    async fn create_ingest(&self, ingest: &Ingest) -> DatabaseResult<bool> {
        dispatch!(self, s => s.create_ingest(ingest).await)
    }

    async fn insert_log_rows(&self, rows: &[LogRow]) -> DatabaseResult<usize> {
        dispatch!(self, s => s.insert_log_rows(rows).await)
    }

    async fn complete_ingest(
        &self,
        ingest_id: Uuid,
        total_rows: u64,
        inserted_rows: u64,
    ) -> DatabaseResult<()> {
        dispatch!(self, s => s.complete_ingest(ingest_id, total_rows, inserted_rows).await)
    }

    async fn recent_ingests(&self, limit: usize) -> DatabaseResult<Vec<Ingest>> {
        dispatch!(self, s => s.recent_ingests(limit).await)
    }

    async fn log_rows_for_ingest(&self, ingest_id: Uuid) -> DatabaseResult<Vec<LogRow>> {
        dispatch!(self, s => s.log_rows_for_ingest(ingest_id).await)
    }

    async fn count_log_rows(&self) -> DatabaseResult<u64> {
        dispatch!(self, s => s.count_log_rows().await)
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        dispatch!(self, s => s.health_check().await)
    }

    fn backend_type(&self) -> &'static str {
        dispatch!(self, s => s.backend_type())
    }

    async fn close(&self) -> DatabaseResult<()> {
        dispatch!(self, s => s.close().await)
    }
}
