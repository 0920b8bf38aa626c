//! Log ingestion CLI command
//!
//! Reports on a log file and ingests it into the workspace store. The report
//! is printed even when persistence fails.

use std::path::PathBuf;

use super::{ReportFormat, read_input, runtime, to_json};
use crate::cli::error::CliError;
use crate::cli::store::ConfiguredStore;
use crate::database::{DatabaseConfig, LogStore, MemoryStore};
use crate::ingest::{IngestPipeline, UploadOutcome, process_upload};

/// Ingest command arguments
#[derive(Debug, Clone)]
pub struct IngestArgs {
    /// Log file to ingest
    pub file: PathBuf,
    /// Workspace path
    pub workspace: PathBuf,
    /// Name recorded on the ingest (defaults to the file name)
    pub name: Option<String>,
    /// Output format
    pub format: ReportFormat,
    /// Use a throwaway in-memory store instead of the configured one
    pub dry_run: bool,
}

/// Report on and ingest one log file
pub fn run_ingest(args: &IngestArgs) -> Result<UploadOutcome, CliError> {
    let config = DatabaseConfig::load(&args.workspace)
        .map_err(|e| CliError::IoError(format!("Failed to load config: {}", e)))?;

    let raw = read_input(&args.file, Some(config.ingest.max_file_size))?;
    let file_name = args.name.clone().or_else(|| {
        args.file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    });

    let rt = runtime()?;
    rt.block_on(async {
        let store = if args.dry_run {
            ConfiguredStore::Memory(MemoryStore::new())
        } else {
            ConfiguredStore::open(&args.workspace, &config).await?
        };
        tracing::debug!(backend = store.backend_type(), "store opened");

        let pipeline = IngestPipeline::new(store);
        let outcome = process_upload(&pipeline, &raw, file_name.as_deref()).await;

        if let Err(e) = pipeline.store().close().await {
            tracing::warn!(error = %e, "failed to close store");
        }
        Ok(outcome)
    })
}

/// Print the report and ingestion summary for one log file
pub fn handle_ingest(args: &IngestArgs) -> Result<(), CliError> {
    let outcome = run_ingest(args)?;

    match args.format {
        ReportFormat::Text => {
            print!("{}", outcome.report.render_text());
            if let Some(summary) = outcome.summary() {
                println!("\n{}", summary);
            }
        }
        ReportFormat::Json => {
            let output = serde_json::json!({
                "report": outcome.report,
                "ingest": outcome.summary(),
            });
            println!("{}", to_json(&output)?);
        }
    }

    outcome.ingest.map(|_| ()).map_err(CliError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_needs_no_workspace_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "t1 INFO api started\nt2 WARN db slow query\n").unwrap();

        let outcome = run_ingest(&IngestArgs {
            file: path,
            workspace: dir.path().to_path_buf(),
            name: None,
            format: ReportFormat::Text,
            dry_run: true,
        })
        .unwrap();

        assert_eq!(outcome.report.records, 2);
        let summary = outcome.summary().unwrap();
        assert_eq!(summary.inserted_rows, 2);
        assert!(!summary.skipped);
    }

    #[test]
    fn test_uninitialized_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "t1 INFO api started\n").unwrap();

        let result = run_ingest(&IngestArgs {
            file: path,
            workspace: dir.path().to_path_buf(),
            name: None,
            format: ReportFormat::Text,
            dry_run: false,
        });
        assert!(matches!(result, Err(CliError::DatabaseError(_))));
    }
}
