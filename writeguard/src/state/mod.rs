//! Observable save state.
//!
//! The coordinator owns one [`SaveState`]; presentation code subscribes to
//! read-only snapshots to disable controls and show retry progress.

use serde::Serialize;
use tokio::sync::watch;

/// Snapshot of an orchestration's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ExecutionState {
    /// True while an orchestration is running.
    pub is_saving: bool,
    /// Retry currently in flight for the running operation, 0 when none.
    pub retry_count: u32,
}

/// Receiver half handed to observers.
pub type StateObserver = watch::Receiver<ExecutionState>;

/// Owner of the mutable state, mutated only by the coordinator.
#[derive(Debug)]
pub struct SaveState {
    tx: watch::Sender<ExecutionState>,
}

impl Default for SaveState {
    fn default() -> Self {
        Self::new()
    }
}

impl SaveState {
    /// Creates an idle state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ExecutionState::default());
        Self { tx }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ExecutionState {
        *self.tx.borrow()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> StateObserver {
        self.tx.subscribe()
    }

    /// Marks an orchestration as started. The state returns to idle when
    /// the guard drops, whichever way the orchestration exits.
    pub(crate) fn begin(&self) -> SavingGuard<'_> {
        self.tx.send_replace(ExecutionState {
            is_saving: true,
            retry_count: 0,
        });
        SavingGuard { state: self }
    }

    pub(crate) fn set_retry_count(&self, retry_count: u32) {
        self.tx.send_if_modified(|current| {
            if current.retry_count == retry_count {
                false
            } else {
                current.retry_count = retry_count;
                true
            }
        });
    }

    fn reset(&self) {
        self.tx.send_replace(ExecutionState::default());
    }
}

/// Resets [`SaveState`] to idle on drop.
#[derive(Debug)]
pub(crate) struct SavingGuard<'a> {
    state: &'a SaveState,
}

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        self.state.reset();
    }
}
