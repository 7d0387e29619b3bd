//! In-memory record store with failure injection.

use super::store::{record_id, Record, RecordStore, ID_FIELD};
use crate::errors::OperationError;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, VecDeque};
use uuid::Uuid;

type Table = BTreeMap<String, Record>;

/// A [`RecordStore`] backed by in-process maps.
///
/// Writes can be scripted to fail with [`fail_writes`](Self::fail_writes),
/// which makes it a stand-in for a flaky remote store in tests and demos.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<HashMap<String, Table>>,
    injected: Mutex<HashMap<String, VecDeque<OperationError>>>,
    writes: Mutex<HashMap<String, usize>>,
}

impl InMemoryRecordStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts records directly, bypassing failure injection.
    pub fn seed(&self, table: &str, records: impl IntoIterator<Item = Record>) {
        let mut tables = self.tables.write();
        let rows = tables.entry(table.to_string()).or_default();
        for record in records {
            if let Ok(id) = record_id(&record) {
                rows.insert(id, record);
            }
        }
    }

    /// Makes the next `times` writes to `table` fail with `error`.
    pub fn fail_writes(&self, table: &str, error: OperationError, times: usize) {
        let mut injected = self.injected.lock();
        let queue = injected.entry(table.to_string()).or_default();
        queue.extend(std::iter::repeat(error).take(times));
    }

    /// Returns a record without going through the async API.
    #[must_use]
    pub fn get(&self, table: &str, id: &str) -> Option<Record> {
        self.tables.read().get(table).and_then(|t| t.get(id)).cloned()
    }

    /// Returns every record in a table, ordered by id.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Record> {
        self.tables
            .read()
            .get(table)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of write calls made against `table`, failed ones included.
    #[must_use]
    pub fn write_count(&self, table: &str) -> usize {
        self.writes.lock().get(table).copied().unwrap_or(0)
    }

    fn begin_write(&self, table: &str) -> Result<(), OperationError> {
        *self.writes.lock().entry(table.to_string()).or_default() += 1;
        match self
            .injected
            .lock()
            .get_mut(table)
            .and_then(VecDeque::pop_front)
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn matches_field(record: &Record, field: &str, value: &serde_json::Value) -> bool {
    record.get(field) == Some(value)
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn fetch(&self, table: &str, id: &str) -> Result<Option<Record>, OperationError> {
        Ok(self.get(table, id))
    }

    async fn fetch_where(
        &self,
        table: &str,
        field: &str,
        value: &serde_json::Value,
    ) -> Result<Vec<Record>, OperationError> {
        Ok(self
            .rows(table)
            .into_iter()
            .filter(|r| matches_field(r, field, value))
            .collect())
    }

    async fn upsert(&self, table: &str, record: Record) -> Result<Record, OperationError> {
        let id = record_id(&record)?;
        self.begin_write(table)?;
        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .insert(id, record.clone());
        Ok(record)
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), OperationError> {
        self.begin_write(table)?;
        if let Some(rows) = self.tables.write().get_mut(table) {
            rows.remove(id);
        }
        Ok(())
    }

    async fn delete_where(
        &self,
        table: &str,
        field: &str,
        value: &serde_json::Value,
    ) -> Result<usize, OperationError> {
        self.begin_write(table)?;
        let mut tables = self.tables.write();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|_, r| !matches_field(r, field, value));
        Ok(before - rows.len())
    }

    async fn insert_many(
        &self,
        table: &str,
        records: Vec<Record>,
    ) -> Result<Vec<Record>, OperationError> {
        self.begin_write(table)?;

        let mut prepared = Vec::with_capacity(records.len());
        for mut record in records {
            let Some(object) = record.as_object_mut() else {
                return Err(OperationError::validation(
                    "Validation failed: record must be a JSON object",
                ));
            };
            if !object.contains_key(ID_FIELD) {
                object.insert(ID_FIELD.to_string(), Uuid::new_v4().to_string().into());
            }
            let id = record_id(&record)?;
            prepared.push((id, record));
        }

        let mut tables = self.tables.write();
        let rows = tables.entry(table.to_string()).or_default();
        if let Some((id, _)) = prepared.iter().find(|(id, _)| rows.contains_key(id)) {
            return Err(OperationError::validation(format!(
                "Validation failed: duplicate key '{id}' in {table}"
            )));
        }
        for (id, record) in &prepared {
            rows.insert(id.clone(), record.clone());
        }
        Ok(prepared.into_iter().map(|(_, r)| r).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_replaces_whole_record() {
        let store = InMemoryRecordStore::new();
        store.seed("agents", [json!({"id": "a1", "name": "old", "tier": 1})]);

        store
            .upsert("agents", json!({"id": "a1", "name": "new"}))
            .await
            .unwrap();

        assert_eq!(store.get("agents", "a1"), Some(json!({"id": "a1", "name": "new"})));
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let store = InMemoryRecordStore::new();
        store.fail_writes("agents", OperationError::transient("timeout"), 2);

        let record = json!({"id": "a1"});
        assert!(store.upsert("agents", record.clone()).await.is_err());
        assert!(store.upsert("agents", record.clone()).await.is_err());
        assert!(store.upsert("agents", record).await.is_ok());
        assert_eq!(store.write_count("agents"), 3);
    }

    #[tokio::test]
    async fn test_insert_many_assigns_ids_and_rejects_duplicates() {
        let store = InMemoryRecordStore::new();
        let inserted = store
            .insert_many("tools", vec![json!({"agent_id": "a1", "name": "search"})])
            .await
            .unwrap();
        assert!(inserted[0].get(ID_FIELD).is_some());

        store.seed("tools", [json!({"id": "t1", "agent_id": "a1"})]);
        let err = store
            .insert_many("tools", vec![json!({"id": "t1"})])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(store.rows("tools").len(), 2);
    }

    #[tokio::test]
    async fn test_delete_where_and_fetch_where() {
        let store = InMemoryRecordStore::new();
        store.seed(
            "tools",
            [
                json!({"id": "t1", "agent_id": "a1"}),
                json!({"id": "t2", "agent_id": "a1"}),
                json!({"id": "t3", "agent_id": "a2"}),
            ],
        );

        let a1 = json!("a1");
        assert_eq!(store.fetch_where("tools", "agent_id", &a1).await.unwrap().len(), 2);
        assert_eq!(store.delete_where("tools", "agent_id", &a1).await.unwrap(), 2);
        assert_eq!(store.rows("tools"), vec![json!({"id": "t3", "agent_id": "a2"})]);
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let store = InMemoryRecordStore::new();
        assert!(store.delete("agents", "nope").await.is_ok());
    }
}
