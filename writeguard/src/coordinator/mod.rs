//! The resilient multi-step write coordinator.
//!
//! [`SaveCoordinator`] runs caller-supplied [`OperationDescriptor`]s strictly
//! in order through a bounded retry engine. If a step fails for good, every
//! step that already succeeded is compensated in reverse order before the
//! failure is reported. Errors never escape: the caller sees `None` plus an
//! `on_error` callback carrying the original failure.
//!
//! ```rust,ignore
//! let coordinator = SaveCoordinator::new(Arc::new(LoggingNotificationSink::new()));
//! let options = SaveOptions::new()
//!     .with_max_retries(3)
//!     .on_error(|err| eprintln!("{err}"));
//!
//! match coordinator.save_multiple(vec![update_agent, replace_tools], &options).await {
//!     Some(results) => render(results),
//!     None => {} // already compensated and reported
//! }
//! ```

mod audit;
mod engine;
mod options;
mod rollback;

pub use audit::{SaveAuditLog, StepRecord, StepStatus};
pub use options::{ErrorCallback, SaveOptions, SuccessCallback};
pub use rollback::{CompletedOperations, UnwindReport};

use crate::errors::{OperationError, SaveError};
use crate::notify::{LoggingNotificationSink, NoOpNotificationSink, Notification, NotificationSink};
use crate::operation::OperationDescriptor;
use crate::retry::RetryPolicy;
use crate::state::{ExecutionState, SaveState, StateObserver};
use engine::RetryEngine;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

/// Failure of one orchestration, before it is shaped into a [`SaveError`].
struct StepFailure {
    step: String,
    position: usize,
    total: usize,
    error: OperationError,
}

/// Coordinates transaction-like saves against a non-transactional store.
///
/// One coordinator owns one [`ExecutionState`]. Concurrent saves on the same
/// coordinator are not guarded against each other; callers should disable
/// whatever triggers a save while [`is_saving`](Self::is_saving) is true.
pub struct SaveCoordinator {
    state: SaveState,
    sink: Arc<dyn NotificationSink>,
}

impl Default for SaveCoordinator {
    fn default() -> Self {
        Self::new(Arc::new(NoOpNotificationSink))
    }
}

impl fmt::Debug for SaveCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveCoordinator")
            .field("state", &self.state.snapshot())
            .finish_non_exhaustive()
    }
}

impl SaveCoordinator {
    /// Creates a coordinator reporting to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            state: SaveState::new(),
            sink,
        }
    }

    /// Creates a coordinator whose notifications go to `tracing`.
    #[must_use]
    pub fn with_logging() -> Self {
        Self::new(Arc::new(LoggingNotificationSink::new()))
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> ExecutionState {
        self.state.snapshot()
    }

    /// True while a save is running.
    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.state.snapshot().is_saving
    }

    /// Retry currently in flight, 0 when none.
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.state.snapshot().retry_count
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> StateObserver {
        self.state.subscribe()
    }

    /// Runs a single operation with retries.
    ///
    /// Returns `None` if it failed; `on_error` then receives the operation's
    /// own error.
    pub async fn save_with_retry<T: Send + 'static>(
        &self,
        operation: OperationDescriptor<T>,
        options: &SaveOptions,
    ) -> Option<T> {
        let (outcome, _audit) = self.orchestrate(vec![operation], options.policy()).await;
        match outcome {
            Ok(mut results) => {
                options.report_success();
                results.pop()
            }
            Err(failure) => {
                options.report_error(&SaveError::Operation(failure.error));
                None
            }
        }
    }

    /// Runs several operations in order as one logical save.
    ///
    /// Returns the per-step results in order, or `None` if any step failed
    /// (after compensating the steps before it). `on_success`/`on_error`
    /// fire once for the whole save.
    pub async fn save_multiple<T: Send + 'static>(
        &self,
        operations: Vec<OperationDescriptor<T>>,
        options: &SaveOptions,
    ) -> Option<Vec<T>> {
        self.save_multiple_with_audit(operations, options).await.0
    }

    /// Like [`save_multiple`](Self::save_multiple), also returning the audit log.
    pub async fn save_multiple_with_audit<T: Send + 'static>(
        &self,
        operations: Vec<OperationDescriptor<T>>,
        options: &SaveOptions,
    ) -> (Option<Vec<T>>, SaveAuditLog) {
        let (outcome, audit) = self.orchestrate(operations, options.policy()).await;
        match outcome {
            Ok(results) => {
                options.report_success();
                (Some(results), audit)
            }
            Err(failure) => {
                options.report_error(&SaveError::StepFailed {
                    step: failure.step,
                    position: failure.position,
                    total: failure.total,
                    source: failure.error,
                });
                (None, audit)
            }
        }
    }

    async fn orchestrate<T: Send + 'static>(
        &self,
        operations: Vec<OperationDescriptor<T>>,
        policy: &RetryPolicy,
    ) -> (Result<Vec<T>, StepFailure>, SaveAuditLog) {
        let _saving = self.state.begin();
        let sink = self.sink.as_ref();
        let engine = RetryEngine {
            state: &self.state,
            sink,
            policy,
        };

        let total = operations.len();
        let mut audit = SaveAuditLog::new();
        let mut completed = CompletedOperations::new();
        let mut results = Vec::with_capacity(total);

        info!(steps = total, max_retries = policy.max_retries, "Starting save");
        sink.notify(Notification::SaveStarted { steps: total }).await;

        for (index, operation) in operations.into_iter().enumerate() {
            let (description, mut execute, rollback) = operation.into_parts();
            let step = audit.record_start(&description);

            match engine.run(&description, &mut execute, &mut audit, step).await {
                Ok(value) => {
                    audit.record_success(step);
                    if let Some(rollback) = rollback {
                        completed.push(step, rollback);
                    }
                    results.push(value);
                }
                Err(err) => {
                    audit.record_failure(step, &err.message);
                    error!(
                        step = %description,
                        position = index + 1,
                        total,
                        kind = %err.kind,
                        error = %err,
                        "Save failed"
                    );

                    let unwind = completed.unwind(sink, &mut audit).await;
                    if !unwind.is_clean() {
                        error!(
                            failed = unwind.failures.len(),
                            "Rollback incomplete, remote data may be inconsistent"
                        );
                    }

                    sink.notify(Notification::SaveFailed {
                        step: description.clone(),
                        error: err.message.clone(),
                    })
                    .await;

                    let failure = StepFailure {
                        step: description,
                        position: index + 1,
                        total,
                        error: err,
                    };
                    return (Err(failure), audit);
                }
            }
        }

        completed.clear();
        info!(steps = total, "Save completed");
        sink.notify(Notification::SaveSucceeded { steps: total }).await;
        (Ok(results), audit)
    }
}
