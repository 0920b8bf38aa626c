//! In-memory storage backend
//!
//! Keeps ingests and rows in process memory behind one mutex. Each trait call
//! takes the lock once, so the uniqueness check and the insert it guards are
//! a single atomic step, as a unique constraint would be in a database.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::{DatabaseError, DatabaseResult, LogStore};
use crate::models::{Ingest, IngestStatus, LogRow};

#[derive(Debug, Default)]
struct MemoryState {
    ingests: HashMap<Uuid, Ingest>,
    ingest_by_hash: HashMap<String, Uuid>,
    rows: Vec<LogRow>,
    row_hashes: HashSet<String>,
}

/// In-memory log store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> DatabaseResult<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| DatabaseError::ConnectionFailed(format!("Lock error: {}", e)))
    }
}

#[async_trait]
impl LogStore for MemoryStore {
    async fn initialize(&self) -> DatabaseResult<()> {
        Ok(())
    }

    async fn find_ingest_by_hash(&self, file_hash: &str) -> DatabaseResult<Option<Ingest>> {
        let state = self.lock()?;
        Ok(state
            .ingest_by_hash
            .get(file_hash)
            .and_then(|id| state.ingests.get(id))
            .cloned())
    }

    async fn get_ingest(&self, ingest_id: Uuid) -> DatabaseResult<Option<Ingest>> {
        Ok(self.lock()?.ingests.get(&ingest_id).cloned())
    }

    async fn create_ingest(&self, ingest: &Ingest) -> DatabaseResult<bool> {
        let mut state = self.lock()?;
        if state.ingest_by_hash.contains_key(&ingest.file_hash) {
            return Ok(false);
        }
        if state.ingests.contains_key(&ingest.id) {
            return Err(DatabaseError::InvalidInput(format!(
                "Duplicate ingest id: {}",
                ingest.id
            )));
        }

        state
            .ingest_by_hash
            .insert(ingest.file_hash.clone(), ingest.id);
        state.ingests.insert(ingest.id, ingest.clone());
        Ok(true)
    }

    async fn insert_log_rows(&self, rows: &[LogRow]) -> DatabaseResult<usize> {
        let mut state = self.lock()?;

        if let Some(row) = rows.iter().find(|r| !state.ingests.contains_key(&r.ingest_id)) {
            return Err(DatabaseError::InvalidInput(format!(
                "Log row references unknown ingest {}",
                row.ingest_id
            )));
        }

        let mut inserted = 0;
        for row in rows {
            if state.row_hashes.insert(row.row_hash.clone()) {
                state.rows.push(row.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn complete_ingest(
        &self,
        ingest_id: Uuid,
        total_rows: u64,
        inserted_rows: u64,
    ) -> DatabaseResult<()> {
        let mut state = self.lock()?;
        let ingest = state.ingests.get_mut(&ingest_id).ok_or_else(|| {
            DatabaseError::QueryFailed(format!("Ingest not found: {}", ingest_id))
        })?;

        ingest.status = IngestStatus::Complete;
        ingest.total_rows = total_rows;
        ingest.inserted_rows = inserted_rows;
        Ok(())
    }

    async fn recent_ingests(&self, limit: usize) -> DatabaseResult<Vec<Ingest>> {
        let state = self.lock()?;
        let mut ingests: Vec<Ingest> = state.ingests.values().cloned().collect();
        ingests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        ingests.truncate(limit);
        Ok(ingests)
    }

    async fn log_rows_for_ingest(&self, ingest_id: Uuid) -> DatabaseResult<Vec<LogRow>> {
        Ok(self
            .lock()?
            .rows
            .iter()
            .filter(|r| r.ingest_id == ingest_id)
            .cloned()
            .collect())
    }

    async fn count_log_rows(&self) -> DatabaseResult<u64> {
        Ok(self.lock()?.rows.len() as u64)
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        Ok(self.state.lock().is_ok())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }

    async fn close(&self) -> DatabaseResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;

    fn row(ingest_id: Uuid, line: &str) -> LogRow {
        LogRow::from_record(ingest_id, &parse_line(line).unwrap())
    }

    #[tokio::test]
    async fn test_create_ingest_conflict() {
        let store = MemoryStore::new();
        let first = Ingest::new("hash-a", None);
        let second = Ingest::new("hash-a", Some("copy.log".to_string()));

        assert!(store.create_ingest(&first).await.unwrap());
        assert!(!store.create_ingest(&second).await.unwrap());

        let found = store.find_ingest_by_hash("hash-a").await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
        assert!(store.get_ingest(second.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_log_rows_skips_duplicates() {
        let store = MemoryStore::new();
        let ingest = Ingest::new("hash-a", None);
        store.create_ingest(&ingest).await.unwrap();

        let rows = vec![
            row(ingest.id, "t1 INFO m one"),
            row(ingest.id, "t2 INFO m two"),
            row(ingest.id, "t1 INFO m one"),
        ];
        assert_eq!(store.insert_log_rows(&rows).await.unwrap(), 2);
        assert_eq!(store.insert_log_rows(&rows).await.unwrap(), 0);
        assert_eq!(store.count_log_rows().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insert_log_rows_unknown_ingest() {
        let store = MemoryStore::new();
        let result = store
            .insert_log_rows(&[row(Uuid::new_v4(), "t INFO m x")])
            .await;
        assert!(matches!(result, Err(DatabaseError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_complete_ingest() {
        let store = MemoryStore::new();
        let ingest = Ingest::new("hash-a", None);
        store.create_ingest(&ingest).await.unwrap();

        store.complete_ingest(ingest.id, 5, 3).await.unwrap();

        let loaded = store.get_ingest(ingest.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, IngestStatus::Complete);
        assert_eq!(loaded.total_rows, 5);
        assert_eq!(loaded.inserted_rows, 3);

        assert!(store.complete_ingest(Uuid::new_v4(), 0, 0).await.is_err());
    }

    #[tokio::test]
    async fn test_recent_ingests_limit() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .create_ingest(&Ingest::new(format!("hash-{}", i), None))
                .await
                .unwrap();
        }
        assert_eq!(store.recent_ingests(3).await.unwrap().len(), 3);
        assert_eq!(store.recent_ingests(10).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_backend_type() {
        let store = MemoryStore::new();
        assert_eq!(store.backend_type(), "memory");
        assert!(store.health_check().await.unwrap());
    }
}
