//! Completed-operations stack and its unwind.

use super::audit::SaveAuditLog;
use crate::errors::RollbackFailure;
use crate::notify::{Notification, NotificationSink};
use crate::operation::Rollback;
use tracing::{debug, warn};

/// Rollbacks of steps that already succeeded, in completion order.
#[derive(Debug, Default)]
pub struct CompletedOperations {
    entries: Vec<(usize, Rollback)>,
}

/// What happened during an unwind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnwindReport {
    /// Steps compensated successfully, in the order they were undone.
    pub rolled_back: Vec<String>,
    /// Compensations that failed, in the order they were attempted.
    pub failures: Vec<RollbackFailure>,
}

impl UnwindReport {
    /// Returns true if every compensation succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl CompletedOperations {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the rollback of the step at audit index `step`.
    pub fn push(&mut self, step: usize, rollback: Rollback) {
        self.entries.push((step, rollback));
    }

    /// Number of pending rollbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no rollback is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops all pending rollbacks without running them.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Runs every pending rollback in LIFO order, leaving the stack empty.
    ///
    /// A failing rollback is logged and recorded; the remaining rollbacks
    /// still run. Emits nothing when the stack is empty.
    pub async fn unwind(
        &mut self,
        sink: &dyn NotificationSink,
        audit: &mut SaveAuditLog,
    ) -> UnwindReport {
        let entries = std::mem::take(&mut self.entries);
        let mut report = UnwindReport::default();
        if entries.is_empty() {
            return report;
        }

        sink.notify(Notification::RollbackStarted {
            steps: entries.len(),
        })
        .await;

        for (step, rollback) in entries.into_iter().rev() {
            let description = rollback.description().to_string();
            match rollback.run().await {
                Ok(()) => {
                    debug!(step = %description, "Rolled back");
                    audit.record_compensated(step);
                    report.rolled_back.push(description);
                }
                Err(error) => {
                    warn!(step = %description, error = %error, "Rollback failed");
                    audit.record_compensation_failed(step, &error.message);
                    report.failures.push(RollbackFailure::new(description, error));
                }
            }
        }

        let notification = if report.is_clean() {
            Notification::RollbackSucceeded {
                steps: report.rolled_back.len(),
            }
        } else {
            Notification::RollbackFailed {
                failed: report.failures.iter().map(|f| f.step.clone()).collect(),
            }
        };
        sink.notify(notification).await;

        report
    }
}
