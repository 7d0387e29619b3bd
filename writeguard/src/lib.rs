//! # Writeguard
//!
//! Transaction-like multi-step writes against stores that offer no
//! multi-record transactions.
//!
//! A save is an ordered list of [`OperationDescriptor`](operation::OperationDescriptor)s,
//! each pairing a forward action with an optional compensating rollback.
//! The coordinator provides:
//!
//! - **Bounded retries**: exponential backoff for transient failures,
//!   immediate stop for validation, access-denied and not-found errors
//! - **Compensation**: on failure, every step that already succeeded is
//!   rolled back in reverse order; a failing rollback never stops the rest
//! - **Observable state**: `is_saving` / `retry_count` through a watch channel
//! - **Notifications**: a human-readable message for every phase of a save
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use writeguard::prelude::*;
//!
//! let store = Arc::new(InMemoryRecordStore::new());
//! let steps = vec![
//!     upsert_record(store.clone(), "agents", agent).await?,
//!     replace_dependents(store.clone(), "tools", "agent_id", json!(id), tools).await?,
//! ];
//!
//! let coordinator = SaveCoordinator::with_logging();
//! if coordinator.save_multiple(steps, &SaveOptions::new()).await.is_none() {
//!     // already rolled back and reported through on_error
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod coordinator;
pub mod errors;
pub mod notify;
pub mod observability;
pub mod operation;
pub mod records;
pub mod retry;
pub mod state;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coordinator::{
        SaveAuditLog, SaveCoordinator, SaveOptions, StepRecord, StepStatus,
    };
    pub use crate::errors::{ErrorKind, OperationError, RollbackFailure, SaveError};
    pub use crate::notify::{
        ChannelNotificationSink, CollectingNotificationSink, LoggingNotificationSink,
        NoOpNotificationSink, Notification, NotificationSink, Severity,
    };
    pub use crate::operation::{OperationDescriptor, Rollback};
    pub use crate::records::{
        delete_record, replace_dependents, upsert_record, InMemoryRecordStore, Record,
        RecordStore,
    };
    pub use crate::retry::{JitterStrategy, RetryPolicy};
    pub use crate::state::{ExecutionState, StateObserver};
}
