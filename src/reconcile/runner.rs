use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use super::{CompletionNotice, TestMirror};
use crate::store::{DEFAULT_RECENT_LIMIT, FeedEvent, StoreError, Subscription, TestChange, TestStore};

/// Delay between showing a completion notice and marking it read
pub const DEFAULT_NOTICE_DELAY: Duration = Duration::from_secs(6);

/// Where completion notices are shown
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &CompletionNotice);
}

/// Keeps a [`TestMirror`] in sync with one user's change feed
pub struct FeedRunner {
    user_id: String,
    store: Arc<dyn TestStore>,
    notifier: Arc<dyn Notifier>,
    mirror: TestMirror,
    subscription: Option<Subscription>,
    notice_delay: Duration,
    recent_limit: usize,
    pending_reads: Vec<JoinHandle<()>>,
}

impl FeedRunner {
    pub fn new(
        user_id: impl Into<String>,
        store: Arc<dyn TestStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            store,
            notifier,
            mirror: TestMirror::new(),
            subscription: None,
            notice_delay: DEFAULT_NOTICE_DELAY,
            recent_limit: DEFAULT_RECENT_LIMIT,
            pending_reads: Vec::new(),
        }
    }

    pub fn with_notice_delay(mut self, delay: Duration) -> Self {
        self.notice_delay = delay;
        self
    }

    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }

    pub fn mirror(&self) -> &TestMirror {
        &self.mirror
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    /// Subscribe, then load the full list. Events that race the load are
    /// merged by id afterwards.
    pub async fn attach(&mut self) -> Result<(), StoreError> {
        self.subscription = Some(self.store.subscribe(&self.user_id));
        self.reload().await?;
        tracing::debug!("Feed attached for {}", self.user_id);
        Ok(())
    }

    /// Stop listening. Nothing is buffered until the next `attach`.
    pub fn detach(&mut self) {
        if self.subscription.take().is_some() {
            tracing::debug!("Feed detached for {}", self.user_id);
        }
    }

    pub async fn reload(&mut self) -> Result<(), StoreError> {
        self.mirror
            .reload(self.store.as_ref(), &self.user_id, self.recent_limit)
            .await
    }

    /// Handle one feed event. `Ok(false)` when detached or the feed closed.
    pub async fn step(&mut self) -> Result<bool, StoreError> {
        let Some(subscription) = self.subscription.as_mut() else {
            return Ok(false);
        };

        match subscription.next().await {
            Some(FeedEvent::Change(change)) => {
                self.handle_change(change).await;
                Ok(true)
            }
            Some(FeedEvent::Lagged(missed)) => {
                tracing::warn!("Feed lagged by {} events, reloading", missed);
                self.reload().await?;
                Ok(true)
            }
            None => {
                tracing::debug!("Feed closed for {}", self.user_id);
                self.subscription = None;
                Ok(false)
            }
        }
    }

    /// Attach if needed and process events until the feed closes
    pub async fn run(&mut self) -> Result<(), StoreError> {
        if !self.is_attached() {
            self.attach().await?;
        }
        while self.step().await? {}
        Ok(())
    }

    /// Wait for scheduled mark-read calls to finish
    pub async fn flush(&mut self) {
        for handle in self.pending_reads.drain(..) {
            if let Err(e) = handle.await {
                tracing::warn!("Mark-read task failed: {}", e);
            }
        }
    }

    async fn handle_change(&mut self, change: TestChange) {
        tracing::debug!("Feed {:?} for test {}", change.kind, change.test.id);
        let notice = self.mirror.apply(change);

        match self.store.statistics(&self.user_id).await {
            Ok(statistics) => self.mirror.set_statistics(statistics),
            Err(e) => tracing::warn!("Failed to refresh statistics: {}", e),
        }

        if let Some(notice) = notice {
            self.notifier.notify(&notice).await;
            self.schedule_mark_read(notice.test_id);
        }
    }

    fn schedule_mark_read(&mut self, test_id: String) {
        self.pending_reads.retain(|h| !h.is_finished());

        let store = Arc::clone(&self.store);
        let user_id = self.user_id.clone();
        let delay = self.notice_delay;
        self.pending_reads.push(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match store.mark_notification_read(&user_id, &test_id).await {
                Ok(true) => {}
                Ok(false) => tracing::warn!("Test {} vanished before it was marked read", test_id),
                Err(e) => tracing::warn!("Failed to mark test {} read: {}", test_id, e),
            }
        }));
    }
}
