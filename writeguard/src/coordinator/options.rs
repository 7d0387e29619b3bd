//! Per-call save options.

use crate::errors::SaveError;
use crate::retry::RetryPolicy;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Invoked once when a save succeeds.
pub type SuccessCallback = Arc<dyn Fn() + Send + Sync>;
/// Invoked once with the terminal error when a save fails.
pub type ErrorCallback = Arc<dyn Fn(&SaveError) + Send + Sync>;

/// Options for one save call: retry policy plus outcome callbacks.
#[derive(Clone, Default)]
pub struct SaveOptions {
    policy: RetryPolicy,
    on_success: Option<SuccessCallback>,
    on_error: Option<ErrorCallback>,
}

impl SaveOptions {
    /// Creates options with the default policy and no callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the retry budget.
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.policy = self.policy.with_max_retries(retries);
        self
    }

    /// Sets the base backoff delay.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.policy = self.policy.with_retry_delay(delay);
        self
    }

    /// Sets the success callback.
    #[must_use]
    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(callback));
        self
    }

    /// Sets the error callback.
    #[must_use]
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SaveError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub(crate) fn report_success(&self) {
        if let Some(callback) = &self.on_success {
            callback();
        }
    }

    pub(crate) fn report_error(&self, error: &SaveError) {
        if let Some(callback) = &self.on_error {
            callback(error);
        }
    }
}

impl fmt::Debug for SaveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveOptions")
            .field("policy", &self.policy)
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::OperationError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_defaults_match_policy_defaults() {
        let options = SaveOptions::new();
        assert_eq!(options.policy(), &RetryPolicy::default());
    }

    #[test]
    fn test_shortcuts_update_policy() {
        let options = SaveOptions::new()
            .with_max_retries(1)
            .with_retry_delay(Duration::from_millis(50));
        assert_eq!(options.policy().max_retries, 1);
        assert_eq!(options.policy().retry_delay_ms, 50);
    }

    #[test]
    fn test_callbacks_fire() {
        let successes = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));
        let s = successes.clone();
        let e = errors.clone();

        let options = SaveOptions::new()
            .on_success(move || {
                s.fetch_add(1, Ordering::SeqCst);
            })
            .on_error(move |_| {
                e.fetch_add(1, Ordering::SeqCst);
            });

        options.report_success();
        options.report_error(&SaveError::from(OperationError::transient("x")));

        assert_eq!(successes.load(Ordering::SeqCst), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_callbacks_are_ignored() {
        let options = SaveOptions::new();
        options.report_success();
        options.report_error(&SaveError::from(OperationError::transient("x")));
    }
}
