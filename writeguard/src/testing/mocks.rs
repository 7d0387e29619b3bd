//! Scripted operations for testing.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::errors::OperationError;
use crate::operation::OperationDescriptor;

/// One journal line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    /// `"execute:<name>"` or `"rollback:<name>"`.
    pub label: String,
    /// When the call happened (tokio clock, so paused time is honoured).
    pub at: Instant,
}

/// Shared, ordered record of every execute and rollback call.
#[derive(Debug, Clone, Default)]
pub struct CallJournal {
    entries: Arc<Mutex<Vec<JournalEntry>>>,
}

impl CallJournal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry stamped with the current time.
    pub fn record(&self, label: impl Into<String>) {
        self.entries.lock().push(JournalEntry {
            label: label.into(),
            at: Instant::now(),
        });
    }

    /// Returns all labels in order.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.label.clone()).collect()
    }

    /// Number of times `name` was executed.
    #[must_use]
    pub fn executions(&self, name: &str) -> usize {
        let label = format!("execute:{name}");
        self.entries.lock().iter().filter(|e| e.label == label).count()
    }

    /// Names of rolled-back operations, in the order their rollbacks ran.
    #[must_use]
    pub fn rollbacks(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter_map(|e| e.label.strip_prefix("rollback:").map(String::from))
            .collect()
    }

    /// Gaps between consecutive executions of `name`.
    #[must_use]
    pub fn execution_gaps(&self, name: &str) -> Vec<Duration> {
        let label = format!("execute:{name}");
        let times: Vec<Instant> = self
            .entries
            .lock()
            .iter()
            .filter(|e| e.label == label)
            .map(|e| e.at)
            .collect();
        times.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Clears the journal.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[derive(Debug, Clone)]
enum RollbackScript {
    None,
    Succeeds,
    Fails(OperationError),
}

/// Builder for an [`OperationDescriptor`] with scripted behaviour.
///
/// By default the operation succeeds on the first attempt and has no
/// rollback.
#[derive(Debug, Clone)]
pub struct ScriptedOperation<T> {
    name: String,
    value: T,
    journal: CallJournal,
    transient_failures: u32,
    failure: Option<OperationError>,
    rollback: RollbackScript,
}

impl<T: Clone + Send + 'static> ScriptedOperation<T> {
    /// Creates a scripted operation that returns `value`.
    #[must_use]
    pub fn new(name: impl Into<String>, value: T, journal: &CallJournal) -> Self {
        Self {
            name: name.into(),
            value,
            journal: journal.clone(),
            transient_failures: 0,
            failure: None,
            rollback: RollbackScript::None,
        }
    }

    /// Fails with a transient error on the first `times` attempts.
    #[must_use]
    pub const fn fail_times(mut self, times: u32) -> Self {
        self.transient_failures = times;
        self
    }

    /// Fails with `error` on every attempt after the transient ones.
    #[must_use]
    pub fn fail_with(mut self, error: OperationError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Attaches a rollback that succeeds.
    #[must_use]
    pub fn with_rollback(mut self) -> Self {
        self.rollback = RollbackScript::Succeeds;
        self
    }

    /// Attaches a rollback that fails with `error`.
    #[must_use]
    pub fn with_failing_rollback(mut self, error: OperationError) -> Self {
        self.rollback = RollbackScript::Fails(error);
        self
    }

    /// Builds the descriptor.
    #[must_use]
    pub fn build(self) -> OperationDescriptor<T> {
        let Self {
            name,
            value,
            journal,
            transient_failures,
            failure,
            rollback,
        } = self;

        let attempts = Arc::new(AtomicU32::new(0));
        let exec_journal = journal.clone();
        let exec_name = name.clone();
        let descriptor = OperationDescriptor::new(name.clone(), move || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            exec_journal.record(format!("execute:{exec_name}"));
            let result = if attempt <= transient_failures {
                Err(OperationError::transient(format!(
                    "{exec_name} attempt {attempt} failed"
                )))
            } else if let Some(error) = &failure {
                Err(error.clone())
            } else {
                Ok(value.clone())
            };
            async move { result }
        });

        match rollback {
            RollbackScript::None => descriptor,
            RollbackScript::Succeeds => descriptor.with_rollback(move || async move {
                journal.record(format!("rollback:{name}"));
                Ok(())
            }),
            RollbackScript::Fails(error) => descriptor.with_rollback(move || async move {
                journal.record(format!("rollback:{name}"));
                Err(error)
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_operation_fails_then_succeeds() {
        let journal = CallJournal::new();
        let op = ScriptedOperation::new("a", 7, &journal).fail_times(1).build();
        let (_, mut execute, rollback) = op.into_parts();

        assert!(execute().await.is_err());
        assert_eq!(execute().await, Ok(7));
        assert!(rollback.is_none());
        assert_eq!(journal.executions("a"), 2);
    }

    #[tokio::test]
    async fn test_scripted_permanent_failure() {
        let journal = CallJournal::new();
        let op = ScriptedOperation::new("a", (), &journal)
            .fail_with(OperationError::not_found("gone"))
            .build();
        let (_, mut execute, _) = op.into_parts();

        assert_eq!(execute().await, Err(OperationError::not_found("gone")));
        assert_eq!(execute().await, Err(OperationError::not_found("gone")));
    }

    #[tokio::test]
    async fn test_scripted_rollbacks_are_journaled() {
        let journal = CallJournal::new();
        let ok = ScriptedOperation::new("ok", (), &journal).with_rollback().build();
        let bad = ScriptedOperation::new("bad", (), &journal)
            .with_failing_rollback(OperationError::transient("nope"))
            .build();

        ok.into_parts().2.unwrap().run().await.unwrap();
        assert!(bad.into_parts().2.unwrap().run().await.is_err());
        assert_eq!(journal.rollbacks(), vec!["ok", "bad"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execution_gaps_use_tokio_clock() {
        let journal = CallJournal::new();
        journal.record("execute:x");
        tokio::time::sleep(Duration::from_millis(50)).await;
        journal.record("execute:x");

        let gaps = journal.execution_gaps("x");
        assert_eq!(gaps.len(), 1);
        assert!(gaps[0] >= Duration::from_millis(50));
    }
}
