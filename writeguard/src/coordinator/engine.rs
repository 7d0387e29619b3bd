//! Single-operation retry engine.

use super::audit::SaveAuditLog;
use crate::errors::OperationError;
use crate::notify::{Notification, NotificationSink};
use crate::operation::ExecuteFn;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::state::SaveState;
use tracing::{debug, warn};

/// Borrowed collaborators for one run of the engine.
pub(crate) struct RetryEngine<'a> {
    pub(crate) state: &'a SaveState,
    pub(crate) sink: &'a dyn NotificationSink,
    pub(crate) policy: &'a RetryPolicy,
}

impl RetryEngine<'_> {
    /// Runs `execute` until it succeeds, the budget is spent, or a
    /// non-retryable error comes back. Returns the last error on failure.
    ///
    /// `retry_count` is 0 whenever this returns.
    pub(crate) async fn run<T>(
        &self,
        description: &str,
        execute: &mut ExecuteFn<T>,
        audit: &mut SaveAuditLog,
        step: usize,
    ) -> Result<T, OperationError> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt: u32 = 1;
        self.state.set_retry_count(0);

        loop {
            audit.record_attempt(step);
            debug!(step = %description, attempt, max_attempts, "Executing operation");

            let error = match execute().await {
                Ok(value) => {
                    self.state.set_retry_count(0);
                    return Ok(value);
                }
                Err(error) => error,
            };

            match self.policy.decide(attempt, &error) {
                RetryDecision::Retry(delay) => {
                    attempt += 1;
                    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                    warn!(
                        step = %description,
                        attempt,
                        max_attempts,
                        delay_ms,
                        error = %error,
                        "Retrying after error"
                    );
                    self.state.set_retry_count(attempt - 1);
                    self.sink
                        .notify(Notification::Retrying {
                            step: description.to_string(),
                            attempt,
                            max_attempts,
                            delay_ms,
                        })
                        .await;
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::NotRetryable => {
                    debug!(step = %description, kind = %error.kind, "Error is not retryable");
                    self.state.set_retry_count(0);
                    return Err(error);
                }
                RetryDecision::GiveUp => {
                    debug!(step = %description, attempts = attempt, "Retry budget exhausted");
                    self.state.set_retry_count(0);
                    return Err(error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::CollectingNotificationSink;
    use crate::operation::OperationDescriptor;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn flaky(failures: u32, calls: &Arc<AtomicU32>) -> ExecuteFn<&'static str> {
        let calls = calls.clone();
        let op = OperationDescriptor::new("flaky", move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n <= failures {
                    Err(OperationError::transient(format!("attempt {n} failed")))
                } else {
                    Ok("done")
                }
            }
        });
        op.into_parts().1
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let state = SaveState::new();
        let sink = CollectingNotificationSink::new();
        let policy = RetryPolicy::new().with_retry_delay(Duration::from_millis(100));
        let engine = RetryEngine {
            state: &state,
            sink: &sink,
            policy: &policy,
        };

        let calls = Arc::new(AtomicU32::new(0));
        let mut execute = flaky(2, &calls);
        let mut audit = SaveAuditLog::new();
        let step = audit.record_start("flaky");

        let started = tokio::time::Instant::now();
        let result = engine.run("flaky", &mut execute, &mut audit, step).await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(300) && elapsed < Duration::from_millis(310));
        assert_eq!(audit.records()[0].attempts, 3);
        assert_eq!(state.snapshot().retry_count, 0);
        assert_eq!(sink.event_types(), vec!["save.retrying", "save.retrying"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_budget() {
        let state = SaveState::new();
        let sink = CollectingNotificationSink::new();
        let policy = RetryPolicy::new()
            .with_max_retries(1)
            .with_retry_delay(Duration::from_millis(10));
        let engine = RetryEngine {
            state: &state,
            sink: &sink,
            policy: &policy,
        };

        let calls = Arc::new(AtomicU32::new(0));
        let mut execute = flaky(u32::MAX, &calls);
        let mut audit = SaveAuditLog::new();
        let step = audit.record_start("flaky");

        let result = engine.run("flaky", &mut execute, &mut audit, step).await;

        assert_eq!(result, Err(OperationError::transient("attempt 2 failed")));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_count_tracks_in_flight_retry() {
        let state = Arc::new(SaveState::new());
        let sink = CollectingNotificationSink::new();
        let policy = RetryPolicy::new().with_retry_delay(Duration::from_millis(10));
        let engine = RetryEngine {
            state: &state,
            sink: &sink,
            policy: &policy,
        };

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let observed = seen.clone();
        let watcher = state.clone();
        let op = OperationDescriptor::new("observe", move || {
            observed.lock().push(watcher.snapshot().retry_count);
            let n = observed.lock().len();
            async move {
                if n < 3 {
                    Err(OperationError::transient("busy"))
                } else {
                    Ok(())
                }
            }
        });
        let (_, mut execute, _) = op.into_parts();
        let mut audit = SaveAuditLog::new();
        let step = audit.record_start("observe");

        engine.run("observe", &mut execute, &mut audit, step).await.unwrap();

        assert_eq!(*seen.lock(), vec![0, 1, 2]);
        assert_eq!(state.snapshot().retry_count, 0);
    }
}
