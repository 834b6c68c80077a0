//! Status reconciliation
//!
//! [`TestMirror`] is an in-memory, eventually consistent copy of one user's
//! recent records. [`FeedRunner`] keeps it in sync with the store's change
//! feed and handles completion notices.

mod runner;

pub use runner::{FeedRunner, Notifier};

use std::collections::HashSet;

use crate::domain::{ApiTest, TestStatistics};
use crate::store::{ChangeKind, StoreError, TestChange, TestStore};

/// One-shot "your scan finished" message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionNotice {
    pub test_id: String,
    pub title: String,
    pub body: String,
}

impl CompletionNotice {
    fn for_test(test: &ApiTest) -> Self {
        Self {
            test_id: test.id.clone(),
            title: "Test Completed!".to_string(),
            body: format!("{} has finished processing.", test.display_name()),
        }
    }
}

#[derive(Debug, Default)]
pub struct TestMirror {
    tests: Vec<ApiTest>,
    statistics: TestStatistics,
    /// Ids already announced by this mirror
    noticed: HashSet<String>,
}

impl TestMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest first
    pub fn tests(&self) -> &[ApiTest] {
        &self.tests
    }

    pub fn get(&self, id: &str) -> Option<&ApiTest> {
        self.tests.iter().find(|t| t.id == id)
    }

    pub fn statistics(&self) -> TestStatistics {
        self.statistics
    }

    pub fn set_statistics(&mut self, statistics: TestStatistics) {
        self.statistics = statistics;
    }

    /// Replace the list and counters wholesale. Never produces notices.
    pub async fn reload(
        &mut self,
        store: &dyn TestStore,
        user_id: &str,
        limit: usize,
    ) -> Result<(), StoreError> {
        let tests = store.list_recent(user_id, limit).await?;
        let statistics = store.statistics(user_id).await?;
        tracing::debug!("Mirror reloaded: {} tests for {}", tests.len(), user_id);
        self.tests = tests;
        self.statistics = statistics;
        Ok(())
    }

    /// Merge one change: replace in place by id, otherwise prepend.
    ///
    /// Returns a notice the first time a completed, unread record is seen.
    pub fn apply(&mut self, change: TestChange) -> Option<CompletionNotice> {
        let TestChange { kind, test } = change;

        if kind == ChangeKind::Delete {
            self.tests.retain(|t| t.id != test.id);
            return None;
        }

        let notice = self.completion_notice(&test);
        match self.tests.iter().position(|t| t.id == test.id) {
            Some(idx) => self.tests[idx] = test,
            None => self.tests.insert(0, test),
        }
        notice
    }

    fn completion_notice(&mut self, test: &ApiTest) -> Option<CompletionNotice> {
        if !test.needs_completion_notice() || !self.noticed.insert(test.id.clone()) {
            return None;
        }
        Some(CompletionNotice::for_test(test))
    }
}
