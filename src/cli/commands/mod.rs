//! CLI command implementations

pub mod db;
pub mod ingest;
pub mod query;
pub mod stats;

use std::path::Path;

use super::error::CliError;

/// Output format for log reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Human-readable text (default)
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            _ => Err(format!("Unknown report format: {}. Use 'text' or 'json'.", s)),
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Text => write!(f, "text"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

/// Read a whole input file, refusing anything larger than `limit` bytes
pub(crate) fn read_input(path: &Path, limit: Option<u64>) -> Result<Vec<u8>, CliError> {
    if !path.exists() {
        return Err(CliError::FileNotFound(path.to_path_buf()));
    }

    if let Some(limit) = limit {
        let size = std::fs::metadata(path)
            .map_err(|e| CliError::FileReadError(path.to_path_buf(), e.to_string()))?
            .len();
        if size > limit {
            return Err(CliError::FileTooLarge {
                path: path.to_path_buf(),
                size,
                limit,
            });
        }
    }

    std::fs::read(path).map_err(|e| CliError::FileReadError(path.to_path_buf(), e.to_string()))
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::IoError(format!("Failed to create runtime: {}", e)))
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(|e| CliError::SerializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_report_format_from_str() {
        assert_eq!(ReportFormat::from_str("TEXT").unwrap(), ReportFormat::Text);
        assert_eq!(ReportFormat::from_str("json").unwrap(), ReportFormat::Json);
        assert!(ReportFormat::from_str("yaml").is_err());
    }

    #[test]
    fn test_read_input_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, vec![b'x'; 64]).unwrap();

        assert_eq!(read_input(&path, Some(64)).unwrap().len(), 64);
        assert!(matches!(
            read_input(&path, Some(63)),
            Err(CliError::FileTooLarge { size: 64, limit: 63, .. })
        ));
        assert!(matches!(
            read_input(&dir.path().join("missing.log"), None),
            Err(CliError::FileNotFound(_))
        ));
    }
}
