//! SQL query CLI command
//!
//! Provides a command to execute SQL queries against the workspace store.

use std::path::PathBuf;

use super::runtime;
use crate::cli::error::CliError;
use crate::cli::store::ConfiguredStore;
use crate::database::{DatabaseConfig, OutputFormat, format_query_result};

/// Query command arguments
#[derive(Debug, Clone)]
pub struct QueryArgs {
    /// SQL query to execute
    pub sql: String,
    /// Workspace path
    pub workspace: PathBuf,
    /// Output format
    pub format: String,
}

/// Execute a SQL query (or a named preset) against the workspace store
pub fn handle_query(args: &QueryArgs) -> Result<(), CliError> {
    let workspace_path = &args.workspace;

    let config = DatabaseConfig::load(workspace_path)
        .map_err(|e| CliError::IoError(format!("Failed to load config: {}", e)))?;

    let output_format: OutputFormat = args
        .format
        .parse()
        .map_err(|e: String| CliError::InvalidArgument(e))?;

    let rt = runtime()?;
    rt.block_on(async {
        let store = ConfiguredStore::open(workspace_path, &config).await?;
        let sql = queries::preset(&args.sql).unwrap_or(args.sql.as_str());
        let result = store.execute_query(sql).await?;

        println!("{}", format_query_result(&result, output_format));

        // Keep JSON output machine-readable
        if output_format != OutputFormat::Json {
            eprintln!("\nExecution time: {}ms", result.execution_time_ms);
        }

        Ok(())
    })
}

/// Common SQL queries over ingested logs
pub mod queries {
    /// Row counts per level across every ingest
    pub const LEVEL_COUNTS: &str = r#"
SELECT level, COUNT(*) AS count
FROM log_rows
GROUP BY level
ORDER BY count DESC, level
"#;

    /// Row counts per module across every ingest
    pub const MODULE_COUNTS: &str = r#"
SELECT module, COUNT(*) AS count
FROM log_rows
GROUP BY module
ORDER BY count DESC, module
"#;

    /// Ingests whose rows were not all written
    pub const INCOMPLETE_INGESTS: &str = r#"
SELECT CAST(id AS VARCHAR) AS id, file_name, status, CAST(created_at AS VARCHAR) AS created_at
FROM ingests
WHERE status <> 'complete'
ORDER BY created_at DESC
"#;

    /// Look up a named query (`levels`, `modules`, `incomplete`)
    pub fn preset(name: &str) -> Option<&'static str> {
        match name {
            "levels" => Some(LEVEL_COUNTS),
            "modules" => Some(MODULE_COUNTS),
            "incomplete" => Some(INCOMPLETE_INGESTS),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(queries::preset("levels"), Some(queries::LEVEL_COUNTS));
        assert!(queries::preset("incomplete").unwrap().contains("status <> 'complete'"));
        assert!(queries::preset("SELECT 1").is_none());
    }

    #[test]
    fn test_query_rejects_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let result = handle_query(&QueryArgs {
            sql: "SELECT 1".to_string(),
            workspace: dir.path().to_path_buf(),
            format: "xml".to_string(),
        });
        assert!(matches!(result, Err(CliError::InvalidArgument(_))));
    }
}
