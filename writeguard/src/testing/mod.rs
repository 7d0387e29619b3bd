//! Testing utilities for code built on the coordinator.
//!
//! This module provides:
//! - Scripted operations that fail a set number of times
//! - A call journal recording executes and rollbacks with timestamps
//! - Assertions over the journal

mod assertions;
mod mocks;

pub use assertions::{
    assert_executed_times, assert_no_rollbacks, assert_rollback_order,
};
pub use mocks::{CallJournal, JournalEntry, ScriptedOperation};
