//! Change feed for `api_tests` rows, filtered per user.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::domain::ApiTest;

/// Events buffered per subscriber before it starts lagging
pub const DEFAULT_FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row change; always carries the full record (the last known one for deletes)
#[derive(Debug, Clone, PartialEq)]
pub struct TestChange {
    pub kind: ChangeKind,
    pub test: ApiTest,
}

impl TestChange {
    pub fn insert(test: ApiTest) -> Self {
        Self {
            kind: ChangeKind::Insert,
            test,
        }
    }

    pub fn update(test: ApiTest) -> Self {
        Self {
            kind: ChangeKind::Update,
            test,
        }
    }

    pub fn delete(test: ApiTest) -> Self {
        Self {
            kind: ChangeKind::Delete,
            test,
        }
    }
}

/// What a subscriber sees
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Change(TestChange),
    /// The subscriber fell behind and `n` events were dropped; reload instead of replaying
    Lagged(u64),
}

/// Publisher side of the feed
#[derive(Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<TestChange>,
}

impl ChangeBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, change: TestChange) {
        // No receivers is the normal state when nobody watches
        let _ = self.tx.send(change);
    }

    /// Subscribe to changes of one user's rows
    pub fn subscribe(&self, user_id: &str) -> Subscription {
        Subscription {
            user_id: user_id.to_string(),
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

/// A live, user-scoped subscription. Dropping it unsubscribes.
pub struct Subscription {
    user_id: String,
    rx: broadcast::Receiver<TestChange>,
}

impl Subscription {
    /// Wait for the next event for this user; `None` once the publisher is gone
    pub async fn next(&mut self) -> Option<FeedEvent> {
        loop {
            match self.rx.recv().await {
                Ok(change) if change.test.user_id == self.user_id => {
                    return Some(FeedEvent::Change(change));
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(n)) => return Some(FeedEvent::Lagged(n)),
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
