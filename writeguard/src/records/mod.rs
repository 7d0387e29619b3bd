//! Remote record access and compensating descriptor builders.
//!
//! Builders in this module read and capture the current state of every
//! record they will touch *before* returning a descriptor, so the rollback
//! can restore the exact prior value: a full-record restore, re-creating a
//! deleted record, or deleting a newly inserted one.

mod compensating;
mod memory;
mod store;

pub use compensating::{delete_record, replace_dependents, upsert_record};
pub use memory::InMemoryRecordStore;
pub use store::{record_id, Record, RecordStore, ID_FIELD};

#[cfg(test)]
pub use store::MockRecordStore;
