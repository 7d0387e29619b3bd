//! Assertions over a [`CallJournal`].

use super::CallJournal;

/// Asserts that `name` was executed exactly `expected` times.
pub fn assert_executed_times(journal: &CallJournal, name: &str, expected: usize) {
    let actual = journal.executions(name);
    assert_eq!(
        actual, expected,
        "Expected '{}' to execute {} time(s), got {}. Journal: {:?}",
        name,
        expected,
        actual,
        journal.labels()
    );
}

/// Asserts that rollbacks ran exactly in `expected` order.
pub fn assert_rollback_order(journal: &CallJournal, expected: &[&str]) {
    let actual = journal.rollbacks();
    assert_eq!(
        actual, expected,
        "Expected rollback order {:?}, got {:?}",
        expected, actual
    );
}

/// Asserts that no rollback ran.
pub fn assert_no_rollbacks(journal: &CallJournal) {
    let actual = journal.rollbacks();
    assert!(actual.is_empty(), "Expected no rollbacks, got {:?}", actual);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_executed_times() {
        let journal = CallJournal::new();
        journal.record("execute:a");
        journal.record("execute:a");
        assert_executed_times(&journal, "a", 2);
        assert_executed_times(&journal, "b", 0);
    }

    #[test]
    #[should_panic(expected = "Expected 'a' to execute 1 time(s)")]
    fn test_assert_executed_times_fails() {
        let journal = CallJournal::new();
        assert_executed_times(&journal, "a", 1);
    }

    #[test]
    fn test_assert_rollback_order() {
        let journal = CallJournal::new();
        journal.record("rollback:b");
        journal.record("execute:c");
        journal.record("rollback:a");
        assert_rollback_order(&journal, &["b", "a"]);
    }

    #[test]
    #[should_panic(expected = "Expected no rollbacks")]
    fn test_assert_no_rollbacks_fails() {
        let journal = CallJournal::new();
        journal.record("rollback:a");
        assert_no_rollbacks(&journal);
    }
}
