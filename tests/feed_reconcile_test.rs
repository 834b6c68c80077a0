//! Integration tests for the status reconciliation feed

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{CallLog, RecordingNotifier, RecordingStore, USER_ID};
use safelens::reconcile::FeedRunner;
use safelens::store::{ChangeBus, TestChange, TestRepository, TestStore};
use safelens::{NewApiTest, ProcessorUpdate, TestResultSummary, TestStatus};

fn draft(name: &str) -> NewApiTest {
    NewApiTest {
        test_name: Some(name.to_string()),
        urls: vec!["https://api.example.com".into()],
        ..Default::default()
    }
}

fn summary() -> TestResultSummary {
    TestResultSummary {
        total_urls: Some(1),
        vulnerabilities_found: Some(2),
        high: Some(2),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_completion_is_announced_once_and_marked_read() {
    let log = CallLog::default();
    let store = Arc::new(RecordingStore::new(log.clone()));
    let notifier = Arc::new(RecordingNotifier::default());

    let existing = store.create(USER_ID, draft("Nightly")).await.unwrap();

    let mut runner = FeedRunner::new(USER_ID, store.clone(), notifier.clone())
        .with_notice_delay(Duration::from_millis(10));
    runner.attach().await.unwrap();
    assert_eq!(runner.mirror().tests().len(), 1);
    assert_eq!(runner.mirror().statistics().pending, 1);

    store
        .inner
        .apply_processor_update(&existing.id, ProcessorUpdate::processing(40))
        .unwrap();
    assert!(runner.step().await.unwrap());
    assert_eq!(runner.mirror().tests()[0].progress, 40);
    assert_eq!(runner.mirror().statistics().processing, 1);
    assert!(notifier.notices().is_empty());

    store
        .inner
        .apply_processor_update(&existing.id, ProcessorUpdate::completed(summary()))
        .unwrap();
    assert!(runner.step().await.unwrap());
    assert_eq!(runner.mirror().statistics().completed, 1);

    let notices = notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].test_id, existing.id);
    assert_eq!(notices[0].body, "Nightly has finished processing.");

    runner.flush().await;
    let stored = store.get(USER_ID, &existing.id).await.unwrap().unwrap();
    assert!(stored.notification_read);

    // The read flip comes back through the feed without a second notice
    assert!(runner.step().await.unwrap());
    assert!(runner.mirror().tests()[0].notification_read);
    assert_eq!(notifier.notices().len(), 1);
    assert_eq!(
        log.calls().iter().filter(|c| **c == "mark_read").count(),
        1
    );
}

#[tokio::test]
async fn test_duplicate_completion_events_notify_once() {
    let repo = Arc::new(TestRepository::new(common::memory_db()));
    let notifier = Arc::new(RecordingNotifier::default());
    let created = repo.create(USER_ID, draft("Burst")).await.unwrap();

    let mut runner = FeedRunner::new(USER_ID, repo.clone(), notifier.clone())
        .with_notice_delay(Duration::from_secs(60));
    runner.attach().await.unwrap();

    let completed = repo
        .apply_processor_update(&created.id, ProcessorUpdate::completed(summary()))
        .unwrap();
    // Same row delivered again before the read flag lands
    repo.changes().publish(TestChange::update(completed));

    assert!(runner.step().await.unwrap());
    assert!(runner.step().await.unwrap());
    assert_eq!(notifier.notices().len(), 1);
}

#[tokio::test]
async fn test_other_users_are_filtered_out() {
    let repo = Arc::new(TestRepository::new(common::memory_db()));
    let notifier = Arc::new(RecordingNotifier::default());

    let mut runner = FeedRunner::new(USER_ID, repo.clone(), notifier.clone());
    runner.attach().await.unwrap();

    repo.create("uid-bob", draft("Bob's")).await.unwrap();
    let mine = repo.create(USER_ID, draft("Mine")).await.unwrap();

    assert!(runner.step().await.unwrap());
    let ids: Vec<_> = runner.mirror().tests().iter().map(|t| t.id.clone()).collect();
    assert_eq!(ids, vec![mine.id]);
}

#[tokio::test]
async fn test_lagged_subscriber_reloads() {
    let repo = Arc::new(TestRepository::with_bus(
        common::memory_db(),
        ChangeBus::new(1),
    ));
    let notifier = Arc::new(RecordingNotifier::default());

    let mut runner = FeedRunner::new(USER_ID, repo.clone(), notifier.clone());
    runner.attach().await.unwrap();

    for i in 0..3 {
        repo.create(USER_ID, draft(&format!("Scan {i}"))).await.unwrap();
    }

    // The overflow surfaces as a lag, answered with a full reload
    assert!(runner.step().await.unwrap());
    assert_eq!(runner.mirror().tests().len(), 3);
    assert_eq!(runner.mirror().statistics().total, 3);
    assert!(notifier.notices().is_empty());
}

#[tokio::test]
async fn test_detach_stops_and_reattach_reloads() {
    let repo = Arc::new(TestRepository::new(common::memory_db()));
    let notifier = Arc::new(RecordingNotifier::default());

    let mut runner = FeedRunner::new(USER_ID, repo.clone(), notifier.clone());
    runner.attach().await.unwrap();
    runner.detach();
    assert!(!runner.is_attached());
    assert!(!runner.step().await.unwrap());

    let missed = repo.create(USER_ID, draft("While away")).await.unwrap();
    repo.apply_processor_update(&missed.id, ProcessorUpdate::completed(summary()))
        .unwrap();

    runner.attach().await.unwrap();
    assert_eq!(runner.mirror().tests()[0].id, missed.id);
    assert_eq!(runner.mirror().tests()[0].status, TestStatus::Completed);
    // Reloads never announce
    assert!(notifier.notices().is_empty());
}
