//! Per-step audit trail of one orchestration.

use chrono::{DateTime, Utc};
use std::time::Instant;

/// Status of a step in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepStatus {
    /// Step is executing or has executed successfully.
    Executed,
    /// Step failed during execution.
    Failed,
    /// Step was compensated successfully.
    Compensated,
    /// Step compensation failed.
    CompensationFailed,
}

/// Record of a step's execution in the save.
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// Description of the step.
    pub description: String,
    /// Current status.
    pub status: StepStatus,
    /// Number of times `execute` was invoked.
    pub attempts: u32,
    /// Wall-clock start time.
    pub started_at: DateTime<Utc>,
    /// Monotonic start, for durations.
    started: Instant,
    /// When execution (or compensation) finished.
    pub completed_at: Option<Instant>,
    /// Last error message seen for this step.
    pub error: Option<String>,
}

impl StepRecord {
    /// Time between start and completion, if completed.
    #[must_use]
    pub fn duration(&self) -> Option<std::time::Duration> {
        self.completed_at.map(|done| done.duration_since(self.started))
    }
}

/// Audit log tracking all step executions in a save.
#[derive(Debug, Clone, Default)]
pub struct SaveAuditLog {
    records: Vec<StepRecord>,
}

impl SaveAuditLog {
    /// Create a new empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a step starting; returns its index.
    pub(crate) fn record_start(&mut self, description: &str) -> usize {
        self.records.push(StepRecord {
            description: description.to_string(),
            status: StepStatus::Executed,
            attempts: 0,
            started_at: Utc::now(),
            started: Instant::now(),
            completed_at: None,
            error: None,
        });
        self.records.len() - 1
    }

    pub(crate) fn record_attempt(&mut self, index: usize) {
        if let Some(record) = self.records.get_mut(index) {
            record.attempts += 1;
        }
    }

    pub(crate) fn record_success(&mut self, index: usize) {
        if let Some(record) = self.records.get_mut(index) {
            record.status = StepStatus::Executed;
            record.completed_at = Some(Instant::now());
        }
    }

    pub(crate) fn record_failure(&mut self, index: usize, error: &str) {
        if let Some(record) = self.records.get_mut(index) {
            record.status = StepStatus::Failed;
            record.completed_at = Some(Instant::now());
            record.error = Some(error.to_string());
        }
    }

    pub(crate) fn record_compensated(&mut self, index: usize) {
        if let Some(record) = self.records.get_mut(index) {
            record.status = StepStatus::Compensated;
            record.completed_at = Some(Instant::now());
        }
    }

    pub(crate) fn record_compensation_failed(&mut self, index: usize, error: &str) {
        if let Some(record) = self.records.get_mut(index) {
            record.status = StepStatus::CompensationFailed;
            record.completed_at = Some(Instant::now());
            record.error = Some(error.to_string());
        }
    }

    /// Get all records in the audit log.
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Total `execute` invocations across all steps.
    #[must_use]
    pub fn total_attempts(&self) -> u32 {
        self.records.iter().map(|r| r.attempts).sum()
    }

    /// Get a summary of the save for display.
    #[must_use]
    pub fn summary(&self) -> String {
        self.records
            .iter()
            .map(|record| {
                let status = match record.status {
                    StepStatus::Executed => "✓",
                    StepStatus::Failed => "✗",
                    StepStatus::Compensated => "↩",
                    StepStatus::CompensationFailed => "⚠",
                };
                if record.attempts > 1 {
                    format!("{status} {} ({} attempts)", record.description, record.attempts)
                } else {
                    format!("{status} {}", record.description)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_audit_log_is_empty() {
        let log = SaveAuditLog::new();
        assert!(log.records().is_empty());
        assert_eq!(log.total_attempts(), 0);
    }

    #[test]
    fn record_start_returns_index() {
        let mut log = SaveAuditLog::new();
        assert_eq!(log.record_start("first"), 0);
        assert_eq!(log.record_start("second"), 1);
        assert!(log.records()[1].completed_at.is_none());
    }

    #[test]
    fn attempts_and_failure_are_tracked() {
        let mut log = SaveAuditLog::new();
        let index = log.record_start("flaky");
        log.record_attempt(index);
        log.record_attempt(index);
        log.record_failure(index, "timeout");

        let record = &log.records()[0];
        assert_eq!(record.attempts, 2);
        assert_eq!(record.status, StepStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("timeout"));
        assert!(record.duration().is_some());
    }

    #[test]
    fn compensation_updates_only_targeted_step() {
        let mut log = SaveAuditLog::new();
        let a = log.record_start("a");
        log.record_success(a);
        let b = log.record_start("b");
        log.record_success(b);

        log.record_compensated(b);
        log.record_compensation_failed(a, "rollback refused");

        assert_eq!(log.records()[0].status, StepStatus::CompensationFailed);
        assert_eq!(log.records()[1].status, StepStatus::Compensated);
    }

    #[test]
    fn summary_formats_all_steps() {
        let mut log = SaveAuditLog::new();
        let a = log.record_start("executed_step");
        log.record_attempt(a);
        log.record_success(a);
        let b = log.record_start("failed_step");
        log.record_attempt(b);
        log.record_attempt(b);
        log.record_failure(b, "boom");

        let summary = log.summary();
        assert!(summary.contains("✓ executed_step"));
        assert!(summary.contains("✗ failed_step (2 attempts)"));
    }
}
