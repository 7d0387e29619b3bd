//! Descriptor builders that snapshot prior state for full-record restores.

use super::store::{record_id, Record, RecordStore};
use crate::errors::OperationError;
use crate::operation::OperationDescriptor;
use std::sync::Arc;
use tracing::debug;

/// Builds a descriptor that upserts `record` into `table`.
///
/// The current version of the record is read now. The rollback restores
/// it in full, or deletes the record if it did not exist before. Upserts
/// keyed by a stable id are idempotent, so retries are safe.
pub async fn upsert_record<S>(
    store: Arc<S>,
    table: &str,
    record: Record,
) -> Result<OperationDescriptor<Record>, OperationError>
where
    S: RecordStore + ?Sized + 'static,
{
    let id = record_id(&record)?;
    let previous = store.fetch(table, &id).await?;
    debug!(table, id = %id, existed = previous.is_some(), "Captured record snapshot");

    let description = format!("Save {table} {id}");
    let table = table.to_string();

    let exec_store = store.clone();
    let exec_table = table.clone();
    let descriptor = OperationDescriptor::new(description, move || {
        let store = exec_store.clone();
        let table = exec_table.clone();
        let record = record.clone();
        async move { store.upsert(&table, record).await }
    });

    Ok(descriptor.with_rollback(move || async move {
        match previous {
            Some(previous) => store.upsert(&table, previous).await.map(drop),
            None => store.delete(&table, &id).await,
        }
    }))
}

/// Builds a descriptor that deletes one record.
///
/// The record is read now; the rollback re-creates it exactly. Deleting a
/// record that does not exist is a not-found error at build time.
pub async fn delete_record<S>(
    store: Arc<S>,
    table: &str,
    id: &str,
) -> Result<OperationDescriptor<()>, OperationError>
where
    S: RecordStore + ?Sized + 'static,
{
    let previous = store
        .fetch(table, id)
        .await?
        .ok_or_else(|| OperationError::not_found(format!("{table} {id} not found")))?;

    let description = format!("Delete {table} {id}");
    let table = table.to_string();
    let id = id.to_string();

    let exec_store = store.clone();
    let exec_table = table.clone();
    let descriptor = OperationDescriptor::new(description, move || {
        let store = exec_store.clone();
        let table = exec_table.clone();
        let id = id.clone();
        async move { store.delete(&table, &id).await }
    });

    Ok(descriptor.with_rollback(move || async move {
        store.upsert(&table, previous).await.map(drop)
    }))
}

/// Builds a descriptor that replaces every row of `table` whose
/// `parent_field` equals `parent_value` with `rows`.
///
/// Append-only inserts are not idempotent, so each attempt deletes the
/// parent's rows and inserts the new set in one step; a retry can never
/// leave duplicates behind. The rollback does the same with the rows that
/// were present when the builder ran.
pub async fn replace_dependents<S>(
    store: Arc<S>,
    table: &str,
    parent_field: &str,
    parent_value: serde_json::Value,
    rows: Vec<Record>,
) -> Result<OperationDescriptor<Vec<Record>>, OperationError>
where
    S: RecordStore + ?Sized + 'static,
{
    let previous = store.fetch_where(table, parent_field, &parent_value).await?;
    debug!(
        table,
        parent_field,
        previous = previous.len(),
        next = rows.len(),
        "Captured dependent rows"
    );

    let description = format!("Replace {table} for {parent_field}={parent_value}");
    let table = table.to_string();
    let parent_field = parent_field.to_string();

    let exec_store = store.clone();
    let exec_table = table.clone();
    let exec_field = parent_field.clone();
    let exec_value = parent_value.clone();
    let descriptor = OperationDescriptor::new(description, move || {
        let store = exec_store.clone();
        let table = exec_table.clone();
        let field = exec_field.clone();
        let value = exec_value.clone();
        let rows = rows.clone();
        async move {
            store.delete_where(&table, &field, &value).await?;
            store.insert_many(&table, rows).await
        }
    });

    Ok(descriptor.with_rollback(move || async move {
        store.delete_where(&table, &parent_field, &parent_value).await?;
        if !previous.is_empty() {
            store.insert_many(&table, previous).await?;
        }
        Ok::<(), OperationError>(())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::InMemoryRecordStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn store() -> Arc<InMemoryRecordStore> {
        Arc::new(InMemoryRecordStore::new())
    }

    #[tokio::test]
    async fn test_upsert_rollback_restores_prior_record() {
        let store = store();
        let prior = json!({"id": "a1", "name": "old", "tier": 1});
        store.seed("agents", [prior.clone()]);

        let op = upsert_record(store.clone(), "agents", json!({"id": "a1", "name": "new"}))
            .await
            .unwrap();
        assert_eq!(op.description(), "Save agents a1");

        let (_, mut execute, rollback) = op.into_parts();
        execute().await.unwrap();
        assert_eq!(store.get("agents", "a1").unwrap()["name"], "new");

        rollback.unwrap().run().await.unwrap();
        assert_eq!(store.get("agents", "a1"), Some(prior));
    }

    #[tokio::test]
    async fn test_upsert_rollback_deletes_new_record() {
        let store = store();
        let op = upsert_record(store.clone(), "agents", json!({"id": "a2"}))
            .await
            .unwrap();

        let (_, mut execute, rollback) = op.into_parts();
        execute().await.unwrap();
        rollback.unwrap().run().await.unwrap();

        assert!(store.get("agents", "a2").is_none());
    }

    #[tokio::test]
    async fn test_delete_rollback_recreates_record() {
        let store = store();
        let prior = json!({"id": "a1", "name": "keep me"});
        store.seed("agents", [prior.clone()]);

        let op = delete_record(store.clone(), "agents", "a1").await.unwrap();
        let (_, mut execute, rollback) = op.into_parts();
        execute().await.unwrap();
        assert!(store.get("agents", "a1").is_none());

        rollback.unwrap().run().await.unwrap();
        assert_eq!(store.get("agents", "a1"), Some(prior));
    }

    #[tokio::test]
    async fn test_delete_missing_record_fails_at_build_time() {
        let err = delete_record(store(), "agents", "ghost").await.unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_replace_dependents_is_safe_to_retry() {
        let store = store();
        store.seed("tools", [json!({"id": "t1", "agent_id": "a1", "name": "old"})]);

        let op = replace_dependents(
            store.clone(),
            "tools",
            "agent_id",
            json!("a1"),
            vec![json!({"agent_id": "a1", "name": "search"})],
        )
        .await
        .unwrap();

        let (_, mut execute, rollback) = op.into_parts();
        execute().await.unwrap();
        execute().await.unwrap();
        let rows = store.rows("tools");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "search");

        rollback.unwrap().run().await.unwrap();
        assert_eq!(
            store.rows("tools"),
            vec![json!({"id": "t1", "agent_id": "a1", "name": "old"})]
        );
    }

    #[tokio::test]
    async fn test_snapshot_read_failure_is_returned() {
        let mut mock = crate::records::MockRecordStore::new();
        mock.expect_fetch()
            .returning(|_, _| Err(OperationError::access_denied("Access denied")));

        let result = upsert_record(Arc::new(mock), "agents", json!({"id": "a1"})).await;
        assert!(result.is_err());
    }
}
