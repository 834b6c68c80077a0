//! Bridges writes made by other processes into the in-process feed.
//!
//! The broadcast bus only sees writes that go through this process's
//! repository. The poller diffs the user's recent rows on an interval and
//! republishes anything new or changed.

use std::collections::HashMap;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::{DEFAULT_RECENT_LIMIT, StoreError, TestChange, TestRepository, TestStore};
use crate::domain::ApiTest;

pub struct ChangePoller {
    repo: TestRepository,
    user_id: String,
    interval: Duration,
    limit: usize,
    seen: HashMap<String, ApiTest>,
}

impl ChangePoller {
    pub fn new(repo: TestRepository, user_id: impl Into<String>, interval: Duration) -> Self {
        Self {
            repo,
            user_id: user_id.into(),
            interval,
            limit: DEFAULT_RECENT_LIMIT,
            seen: HashMap::new(),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Record the current rows without publishing them
    pub async fn prime(&mut self) -> Result<(), StoreError> {
        let tests = self.repo.list_recent(&self.user_id, self.limit).await?;
        self.seen = tests.into_iter().map(|t| (t.id.clone(), t)).collect();
        Ok(())
    }

    /// Publish rows that appeared or changed since the last poll
    pub async fn poll_once(&mut self) -> Result<usize, StoreError> {
        let tests = self.repo.list_recent(&self.user_id, self.limit).await?;
        let mut published = 0;

        // Oldest first so prepends keep newest on top
        for test in tests.into_iter().rev() {
            let change = match self.seen.get(&test.id) {
                None => TestChange::insert(test.clone()),
                Some(previous) if *previous != test => TestChange::update(test.clone()),
                Some(_) => continue,
            };
            self.seen.insert(test.id.clone(), test);
            self.repo.changes().publish(change);
            published += 1;
        }

        Ok(published)
    }

    /// Poll on the interval until aborted.
    ///
    /// Call [`prime`](Self::prime) first, before the reader loads its
    /// snapshot, so nothing written in between is missed.
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match self.poll_once().await {
                    Ok(0) => {}
                    Ok(n) => tracing::debug!("Change poller republished {} rows", n),
                    Err(e) => tracing::warn!("Change poller failed: {}", e),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewApiTest, ProcessorUpdate};
    use crate::store::{ChangeKind, FeedEvent, SafeLensDb};

    fn draft() -> NewApiTest {
        NewApiTest {
            urls: vec!["https://a.example".into()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn republishes_rows_written_elsewhere() {
        let db = SafeLensDb::open_in_memory().unwrap();
        let writer = TestRepository::new(db.clone());
        let reader = TestRepository::new(db);

        let existing = writer.create("u1", draft()).await.unwrap();
        let mut poller = ChangePoller::new(reader.clone(), "u1", Duration::from_millis(10));
        poller.prime().await.unwrap();
        let mut sub = reader.subscribe("u1");

        assert_eq!(poller.poll_once().await.unwrap(), 0);

        writer
            .apply_processor_update(&existing.id, ProcessorUpdate::processing(30))
            .unwrap();
        let fresh = writer.create("u1", draft()).await.unwrap();

        assert_eq!(poller.poll_once().await.unwrap(), 2);

        let Some(FeedEvent::Change(first)) = sub.next().await else {
            panic!("expected a change");
        };
        assert_eq!(first.kind, ChangeKind::Update);
        assert_eq!(first.test.progress, 30);

        let Some(FeedEvent::Change(second)) = sub.next().await else {
            panic!("expected a change");
        };
        assert_eq!(second.kind, ChangeKind::Insert);
        assert_eq!(second.test.id, fresh.id);

        assert_eq!(poller.poll_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn spawned_poller_keeps_its_primed_baseline() {
        let db = SafeLensDb::open_in_memory().unwrap();
        let writer = TestRepository::new(db.clone());
        let reader = TestRepository::new(db);

        let mut poller = ChangePoller::new(reader.clone(), "u1", Duration::from_millis(10));
        poller.prime().await.unwrap();

        // Lands after the baseline but before anyone subscribes
        let between = writer.create("u1", draft()).await.unwrap();

        let mut sub = reader.subscribe("u1");
        let handle = poller.spawn();

        let event = tokio::time::timeout(Duration::from_secs(2), sub.next())
            .await
            .expect("poller never republished the row");
        let Some(FeedEvent::Change(change)) = event else {
            panic!("expected a change");
        };
        assert_eq!(change.kind, ChangeKind::Insert);
        assert_eq!(change.test.id, between.id);

        handle.abort();
    }
}
