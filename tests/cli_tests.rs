//! Integration tests for CLI

#![cfg(all(feature = "cli", feature = "duckdb-backend"))]

use log_ingest_sdk::cli::CliError;
use log_ingest_sdk::cli::commands::ReportFormat;
use log_ingest_sdk::cli::commands::db::{
    DbInitArgs, DbStatusArgs, handle_db_init, handle_db_status,
};
use log_ingest_sdk::cli::commands::ingest::{IngestArgs, handle_ingest, run_ingest};
use log_ingest_sdk::cli::commands::query::{QueryArgs, handle_query};
use log_ingest_sdk::cli::commands::stats::{StatsArgs, build_report, handle_stats};
use log_ingest_sdk::database::DatabaseConfig;
use std::path::{Path, PathBuf};

const SAMPLE_LOG: &str = "2023-01-01T00:00:00 INFO moduleA Started processing\n\
                          2023-01-01T00:00:01 ERROR moduleB Failed to process\n\
                          2023-01-01T00:00:02 DEBUG moduleA Debugging info\n\
                          garbage\n";

fn write_log(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn init_workspace(dir: &Path) {
    handle_db_init(&DbInitArgs {
        workspace: dir.to_path_buf(),
        backend: "duckdb".to_string(),
        connection_string: None,
    })
    .unwrap();
}

fn ingest_args(dir: &Path, file: PathBuf) -> IngestArgs {
    IngestArgs {
        file,
        workspace: dir.to_path_buf(),
        name: None,
        format: ReportFormat::Text,
        dry_run: false,
    }
}

#[test]
fn test_cli_stats() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_log(dir.path(), "app.log", SAMPLE_LOG);

    let args = StatsArgs {
        file,
        format: ReportFormat::Json,
    };
    let report = build_report(&args).unwrap();
    assert_eq!(report.records, 3);
    assert_eq!(report.levels.info, 1);
    assert_eq!(report.modules.get("moduleA"), Some(&2));

    assert!(handle_stats(&args).is_ok());
}

#[test]
fn test_cli_stats_missing_file() {
    let result = handle_stats(&StatsArgs {
        file: PathBuf::from("/nonexistent/app.log"),
        format: ReportFormat::Text,
    });
    assert!(matches!(result, Err(CliError::FileNotFound(_))));
}

#[test]
fn test_cli_init_ingest_status_query() {
    let dir = tempfile::tempdir().unwrap();
    init_workspace(dir.path());
    assert!(DatabaseConfig::is_initialized(dir.path()));

    let file = write_log(dir.path(), "app.log", SAMPLE_LOG);

    let first = run_ingest(&ingest_args(dir.path(), file.clone())).unwrap();
    let summary = first.summary().unwrap();
    assert!(!summary.skipped);
    assert_eq!(summary.inserted_rows, 3);
    assert_eq!(first.report.records, 3);

    // The same file again is reported but not re-ingested
    let second = run_ingest(&ingest_args(dir.path(), file.clone())).unwrap();
    let again = second.summary().unwrap();
    assert!(again.skipped);
    assert_eq!(again.ingest_id, summary.ingest_id);
    assert_eq!(second.report.records, 3);

    assert!(handle_ingest(&ingest_args(dir.path(), file)).is_ok());

    assert!(
        handle_db_status(&DbStatusArgs {
            workspace: dir.path().to_path_buf(),
            limit: 5,
        })
        .is_ok()
    );

    for sql in ["levels", "modules", "incomplete", "SELECT COUNT(*) AS n FROM log_rows"] {
        let result = handle_query(&QueryArgs {
            sql: sql.to_string(),
            workspace: dir.path().to_path_buf(),
            format: "json".to_string(),
        });
        assert!(result.is_ok(), "query should succeed: {}", sql);
    }
}

#[test]
fn test_cli_ingest_overlapping_files() {
    let dir = tempfile::tempdir().unwrap();
    init_workspace(dir.path());

    let a = write_log(dir.path(), "a.log", "t1 INFO api up\nt2 WARN db slow\n");
    let b = write_log(dir.path(), "b.log", "t2 WARN db slow\nt3 ERROR api down\n");

    run_ingest(&ingest_args(dir.path(), a)).unwrap();
    let outcome = run_ingest(&ingest_args(dir.path(), b)).unwrap();
    let summary = outcome.summary().unwrap();

    assert_eq!(summary.total_rows, 2);
    assert_eq!(summary.inserted_rows, 1);
}

#[test]
fn test_cli_ingest_respects_max_file_size() {
    let dir = tempfile::tempdir().unwrap();
    init_workspace(dir.path());

    let mut config = DatabaseConfig::load(dir.path()).unwrap();
    config.ingest.max_file_size = 16;
    config.save(dir.path()).unwrap();

    let file = write_log(dir.path(), "big.log", SAMPLE_LOG);
    let result = run_ingest(&ingest_args(dir.path(), file));
    assert!(matches!(result, Err(CliError::FileTooLarge { limit: 16, .. })));
}

#[test]
fn test_cli_query_invalid_sql() {
    let dir = tempfile::tempdir().unwrap();
    init_workspace(dir.path());

    let result = handle_query(&QueryArgs {
        sql: "SELECT * FROM no_such_table".to_string(),
        workspace: dir.path().to_path_buf(),
        format: "table".to_string(),
    });
    assert!(matches!(result, Err(CliError::DatabaseError(_))));
}
