//! Persisted form of a parsed log record

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::parser::LogRecord;

/// A log record tagged with its ingest and content digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRow {
    /// Owning ingest
    pub ingest_id: Uuid,
    pub timestamp: String,
    pub level: String,
    pub module: String,
    pub message: String,
    /// Digest of timestamp, level, module and message (unique across the store)
    pub row_hash: String,
}

impl LogRow {
    pub fn from_record(ingest_id: Uuid, record: &LogRecord) -> Self {
        Self {
            ingest_id,
            timestamp: record.timestamp.clone(),
            level: record.level.clone(),
            module: record.module.clone(),
            message: record.message.clone(),
            row_hash: record.row_hash(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;

    #[test]
    fn test_from_record() {
        let record = parse_line("2023-01-01T00:00:00 INFO moduleA Started processing").unwrap();
        let ingest_id = Uuid::new_v4();
        let row = LogRow::from_record(ingest_id, &record);

        assert_eq!(row.ingest_id, ingest_id);
        assert_eq!(row.module, "moduleA");
        assert_eq!(row.row_hash, record.row_hash());
    }

    #[test]
    fn test_same_content_same_hash_across_ingests() {
        let record = parse_line("t ERROR m boom").unwrap();
        let a = LogRow::from_record(Uuid::new_v4(), &record);
        let b = LogRow::from_record(Uuid::new_v4(), &record);
        assert_eq!(a.row_hash, b.row_hash);
    }
}
