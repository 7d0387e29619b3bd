//! Operation descriptors: a forward action plus its optional compensation.

use crate::errors::OperationError;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Boxed forward action. Invoked once per attempt.
pub(crate) type ExecuteFn<T> =
    Box<dyn FnMut() -> BoxFuture<'static, Result<T, OperationError>> + Send>;

type RollbackFn = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), OperationError>> + Send>;

/// A one-shot compensating action.
///
/// Rollbacks get exactly one attempt; a failing rollback is reported but
/// never retried.
pub struct Rollback {
    description: String,
    action: RollbackFn,
}

impl Rollback {
    /// Creates a new rollback.
    pub fn new<F, Fut>(description: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), OperationError>> + Send + 'static,
    {
        Self {
            description: description.into(),
            action: Box::new(move || action().boxed()),
        }
    }

    /// Returns the description of the step this rollback compensates.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Runs the compensating action, consuming it.
    pub async fn run(self) -> Result<(), OperationError> {
        (self.action)().await
    }
}

impl fmt::Debug for Rollback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rollback")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A unit of work for the coordinator.
///
/// Built by the caller immediately before a save, after it has captured
/// whatever "before" state the rollback needs.
///
/// ```rust,ignore
/// let op = OperationDescriptor::new("Update agent", move || {
///     let store = store.clone();
///     async move { store.upsert("agents", updated).await }
/// })
/// .with_rollback(move || async move { restore(previous).await });
/// ```
pub struct OperationDescriptor<T> {
    description: String,
    execute: ExecuteFn<T>,
    rollback: Option<Rollback>,
}

impl<T: Send + 'static> OperationDescriptor<T> {
    /// Creates a descriptor without a compensating action.
    pub fn new<F, Fut>(description: impl Into<String>, mut execute: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, OperationError>> + Send + 'static,
    {
        Self {
            description: description.into(),
            execute: Box::new(move || execute().boxed()),
            rollback: None,
        }
    }

    /// Attaches a compensating action.
    #[must_use]
    pub fn with_rollback<F, Fut>(mut self, rollback: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), OperationError>> + Send + 'static,
    {
        self.rollback = Some(Rollback::new(self.description.clone(), rollback));
        self
    }

    /// Transforms the success value, keeping the description and rollback.
    ///
    /// A save runs descriptors of one output type; this lets steps that
    /// return different records share a save.
    #[must_use]
    pub fn map<U, F>(self, f: F) -> OperationDescriptor<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let mut execute = self.execute;
        OperationDescriptor {
            description: self.description,
            execute: Box::new(move || {
                let f = f.clone();
                execute().map(move |result| result.map(|value| (*f)(value))).boxed()
            }),
            rollback: self.rollback,
        }
    }
}

impl<T> OperationDescriptor<T> {
    /// Returns the human-readable label.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns true if a compensating action is attached.
    #[must_use]
    pub const fn has_rollback(&self) -> bool {
        self.rollback.is_some()
    }

    pub(crate) fn into_parts(self) -> (String, ExecuteFn<T>, Option<Rollback>) {
        (self.description, self.execute, self.rollback)
    }
}

impl<T> fmt::Debug for OperationDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("description", &self.description)
            .field("has_rollback", &self.rollback.is_some())
            .finish_non_exhaustive()
    }
}
