//! Log statistics CLI command
//!
//! Parses a log file and prints its level and module statistics without
//! touching any store.

use std::path::PathBuf;

use super::{ReportFormat, read_input, to_json};
use crate::cli::error::CliError;
use crate::parser::{parse_bytes, with_source};
use crate::stats::{LogReport, aggregate};

/// Stats command arguments
#[derive(Debug, Clone)]
pub struct StatsArgs {
    /// Log file to analyse
    pub file: PathBuf,
    /// Output format
    pub format: ReportFormat,
}

/// Build the report for a log file
pub fn build_report(args: &StatsArgs) -> Result<LogReport, CliError> {
    let raw = read_input(&args.file, None)?;
    let logs = with_source(parse_bytes(&raw), args.file.display().to_string());
    Ok(aggregate(&logs))
}

/// Print statistics for a log file
pub fn handle_stats(args: &StatsArgs) -> Result<(), CliError> {
    let report = build_report(args)?;

    match args.format {
        ReportFormat::Text => print!("{}", report.render_text()),
        ReportFormat::Json => println!("{}", to_json(&report)?),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(
            &path,
            "t1 INFO api started\nnot a record\nt2 error api lowercase level\n",
        )
        .unwrap();

        let report = build_report(&StatsArgs {
            file: path,
            format: ReportFormat::Text,
        })
        .unwrap();

        assert_eq!(report.records, 2);
        assert_eq!(report.levels.info, 1);
        assert_eq!(report.levels.invalid, 1);
    }

    #[test]
    fn test_missing_file() {
        let result = handle_stats(&StatsArgs {
            file: PathBuf::from("/nonexistent/app.log"),
            format: ReportFormat::Json,
        });
        assert!(matches!(result, Err(CliError::FileNotFound(_))));
    }
}
