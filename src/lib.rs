//! Log Ingest SDK - tolerant log parsing, statistics and deduplicating ingestion
//!
//! Provides:
//! - Line parsing of `<TIMESTAMP> <LEVEL> <MODULE> <MESSAGE...>` logs
//! - Level, module and level-per-module statistics
//! - Content hashing for file-level and row-level deduplication
//! - An ingestion pipeline writing to pluggable stores (memory, DuckDB, PostgreSQL)
//! - Workspace configuration and an optional CLI

pub mod database;
pub mod hash;
pub mod ingest;
pub mod models;
pub mod parser;
pub mod stats;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export commonly used types
pub use parser::{
    LogRecord, ParseError, ParsedLogSet, parse_bytes, parse_file, parse_line, parse_reader,
    parse_str,
};
pub use stats::{
    Level, LevelStats, LevelsPerModule, LogReport, ModuleStats, aggregate,
    calculate_levels_per_module, calculate_module_stats, calculate_stats,
};

pub use ingest::{IngestError, IngestPipeline, IngestResult, UploadOutcome, process_upload};

pub use database::{DatabaseConfig, DatabaseError, DatabaseResult, LogStore, MemoryStore};
#[cfg(feature = "duckdb-backend")]
pub use database::DuckDBBackend;
#[cfg(feature = "postgres-backend")]
pub use database::PostgresBackend;

// Re-export models
pub use models::{Ingest, IngestStatus, IngestSummary, LogRow};
