//! Notification payloads.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How prominently a notification should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Progress information.
    Info,
    /// Something went wrong but the system is compensating.
    Warning,
    /// The save failed or data may be inconsistent.
    Error,
    /// The save completed.
    Success,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Success => write!(f, "success"),
        }
    }
}

/// One phase transition of a save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// An orchestration began.
    SaveStarted {
        /// Number of steps to run.
        steps: usize,
    },
    /// An operation is about to be retried.
    Retrying {
        /// Description of the retrying step.
        step: String,
        /// Attempt about to run (1-based, so the first retry is attempt 2).
        attempt: u32,
        /// Total attempts allowed.
        max_attempts: u32,
        /// Backoff before the attempt, in milliseconds.
        delay_ms: u64,
    },
    /// Compensating actions are about to run.
    RollbackStarted {
        /// Number of rollbacks queued.
        steps: usize,
    },
    /// Every compensating action succeeded.
    RollbackSucceeded {
        /// Number of steps rolled back.
        steps: usize,
    },
    /// At least one compensating action failed.
    RollbackFailed {
        /// Descriptions of the steps whose rollback failed.
        failed: Vec<String>,
    },
    /// The orchestration failed.
    SaveFailed {
        /// Description of the step that failed.
        step: String,
        /// The step's error message.
        error: String,
    },
    /// The orchestration succeeded.
    SaveSucceeded {
        /// Number of steps run.
        steps: usize,
    },
}

impl Notification {
    /// Stable event name, e.g. `"save.started"`.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::SaveStarted { .. } => "save.started",
            Self::Retrying { .. } => "save.retrying",
            Self::RollbackStarted { .. } => "rollback.started",
            Self::RollbackSucceeded { .. } => "rollback.succeeded",
            Self::RollbackFailed { .. } => "rollback.failed",
            Self::SaveFailed { .. } => "save.failed",
            Self::SaveSucceeded { .. } => "save.succeeded",
        }
    }

    /// Severity for display.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::SaveStarted { .. } | Self::RollbackStarted { .. } => Severity::Info,
            Self::Retrying { .. } | Self::RollbackSucceeded { .. } => Severity::Warning,
            Self::RollbackFailed { .. } | Self::SaveFailed { .. } => Severity::Error,
            Self::SaveSucceeded { .. } => Severity::Success,
        }
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::SaveStarted { steps: 1 } => "Saving changes...".to_string(),
            Self::SaveStarted { steps } => format!("Saving changes ({steps} steps)..."),
            Self::Retrying {
                attempt,
                max_attempts,
                ..
            } => format!("Retrying... (attempt {attempt} of {max_attempts})"),
            Self::RollbackStarted { .. } => "Rolling back changes...".to_string(),
            Self::RollbackSucceeded { .. } => "Changes rolled back successfully".to_string(),
            Self::RollbackFailed { failed } => format!(
                "Rollback failed for: {}. Please refresh the page and verify your data.",
                failed.join(", ")
            ),
            Self::SaveFailed { step, error } => format!("Save failed at '{step}': {error}"),
            Self::SaveSucceeded { .. } => "Changes saved successfully".to_string(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_message_counts_attempts() {
        let n = Notification::Retrying {
            step: "Update agent".to_string(),
            attempt: 2,
            max_attempts: 4,
            delay_ms: 1000,
        };
        assert_eq!(n.message(), "Retrying... (attempt 2 of 4)");
        assert_eq!(n.severity(), Severity::Warning);
        assert_eq!(n.event_type(), "save.retrying");
    }

    #[test]
    fn test_rollback_failed_tells_user_to_refresh() {
        let n = Notification::RollbackFailed {
            failed: vec!["Update mappings".to_string(), "Update agent".to_string()],
        };
        let message = n.message();
        assert!(message.contains("Update mappings, Update agent"));
        assert!(message.contains("refresh"));
        assert_eq!(n.severity(), Severity::Error);
    }

    #[test]
    fn test_save_failed_names_step() {
        let n = Notification::SaveFailed {
            step: "Insert tools".to_string(),
            error: "Validation failed".to_string(),
        };
        assert_eq!(n.to_string(), "Save failed at 'Insert tools': Validation failed");
    }

    #[test]
    fn test_serializes_with_type_tag() {
        let json = serde_json::to_value(Notification::SaveStarted { steps: 3 }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "save_started", "steps": 3}));
    }
}
