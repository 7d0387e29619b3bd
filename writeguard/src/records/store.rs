//! The remote table client seam.

use crate::errors::OperationError;
use async_trait::async_trait;

/// A record: a JSON object with an [`ID_FIELD`] key.
pub type Record = serde_json::Value;

/// Field holding a record's primary key.
pub const ID_FIELD: &str = "id";

/// Returns the record's id as a string.
///
/// Numeric ids are rendered in decimal. A record without an id is a
/// validation error.
pub fn record_id(record: &Record) -> Result<String, OperationError> {
    match record.get(ID_FIELD) {
        Some(serde_json::Value::String(id)) => Ok(id.clone()),
        Some(serde_json::Value::Number(id)) => Ok(id.to_string()),
        _ => Err(OperationError::validation(format!(
            "Validation failed: record has no '{ID_FIELD}' field"
        ))),
    }
}

/// Client for a remote, non-transactional table store.
///
/// Implementations classify their failures with an
/// [`ErrorKind`](crate::errors::ErrorKind) before returning them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Reads one record by id.
    async fn fetch(&self, table: &str, id: &str) -> Result<Option<Record>, OperationError>;

    /// Reads every record whose `field` equals `value`.
    async fn fetch_where(
        &self,
        table: &str,
        field: &str,
        value: &serde_json::Value,
    ) -> Result<Vec<Record>, OperationError>;

    /// Inserts or fully replaces a record keyed by its id.
    async fn upsert(&self, table: &str, record: Record) -> Result<Record, OperationError>;

    /// Deletes one record by id. Deleting a missing record is not an error.
    async fn delete(&self, table: &str, id: &str) -> Result<(), OperationError>;

    /// Deletes every record whose `field` equals `value`, returning how many.
    async fn delete_where(
        &self,
        table: &str,
        field: &str,
        value: &serde_json::Value,
    ) -> Result<usize, OperationError>;

    /// Appends records. Records without an id are assigned one.
    async fn insert_many(
        &self,
        table: &str,
        records: Vec<Record>,
    ) -> Result<Vec<Record>, OperationError>;
}
