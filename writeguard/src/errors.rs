//! Error types for the writeguard coordinator.
//!
//! Failures are tagged with an [`ErrorKind`] at the boundary that produces
//! them (usually the remote data client), so the retry engine never has to
//! inspect message text to decide whether an attempt is worth repeating.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Classification of an operation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Network hiccups, timeouts, conflicts. Worth another attempt.
    #[default]
    Transient,
    /// The store rejected the payload.
    Validation,
    /// The caller is not allowed to perform the write.
    AccessDenied,
    /// The targeted record does not exist.
    NotFound,
}

impl ErrorKind {
    /// Returns true if an operation failing with this kind may be retried.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Transient)
    }

    /// Classifies a raw error message.
    ///
    /// Intended for client adapters that only receive message text from the
    /// remote store. Matching is case-insensitive; anything unrecognised is
    /// treated as transient.
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("validation") {
            Self::Validation
        } else if lower.contains("access denied") || lower.contains("permission denied") {
            Self::AccessDenied
        } else if lower.contains("not found") {
            Self::NotFound
        } else {
            Self::Transient
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Validation => write!(f, "validation"),
            Self::AccessDenied => write!(f, "access_denied"),
            Self::NotFound => write!(f, "not_found"),
        }
    }
}

/// A failure reported by a forward or compensating action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct OperationError {
    /// How the failure should be treated by the retry engine.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
}

impl OperationError {
    /// Creates a new operation error.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a transient (retryable) error.
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Creates an access-denied error.
    #[must_use]
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AccessDenied, message)
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Creates an error whose kind is derived from the message text.
    #[must_use]
    pub fn classified(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorKind::classify(&message), message)
    }

    /// Returns true if the failed operation may be retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("kind".to_string(), serde_json::json!(self.kind));
        map.insert("message".to_string(), serde_json::json!(self.message));
        map.insert("retryable".to_string(), serde_json::json!(self.is_retryable()));
        map
    }
}

impl From<anyhow::Error> for OperationError {
    fn from(err: anyhow::Error) -> Self {
        Self::classified(format!("{err:#}"))
    }
}

/// A compensating action that failed while unwinding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rollback failed for '{step}': {error}")]
pub struct RollbackFailure {
    /// Description of the step whose rollback failed.
    pub step: String,
    /// The rollback's own error.
    #[source]
    pub error: OperationError,
}

impl RollbackFailure {
    /// Creates a new rollback failure.
    #[must_use]
    pub fn new(step: impl Into<String>, error: OperationError) -> Self {
        Self {
            step: step.into(),
            error,
        }
    }
}

/// The terminal error handed to `on_error` callbacks.
///
/// Rollback failures never appear here; they are reported through
/// notifications and the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SaveError {
    /// A single-step save failed with the operation's own error.
    #[error(transparent)]
    Operation(#[from] OperationError),

    /// One step of a multi-step save failed.
    #[error("step {position} of {total} ('{step}') failed: {source}")]
    StepFailed {
        /// Description of the failed step.
        step: String,
        /// 1-based position of the failed step.
        position: usize,
        /// Number of steps in the orchestration.
        total: usize,
        /// The step's original error.
        #[source]
        source: OperationError,
    },
}

impl SaveError {
    /// Returns the original operation error.
    #[must_use]
    pub const fn operation_error(&self) -> &OperationError {
        match self {
            Self::Operation(err) | Self::StepFailed { source: err, .. } => err,
        }
    }

    /// Returns the kind of the original failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.operation_error().kind
    }

    /// Returns the description of the failed step, for multi-step saves.
    #[must_use]
    pub fn failed_step(&self) -> Option<&str> {
        match self {
            Self::Operation(_) => None,
            Self::StepFailed { step, .. } => Some(step),
        }
    }
}
