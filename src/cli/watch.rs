//! Watch command implementation

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use safelens::reconcile::{CompletionNotice, FeedRunner, Notifier};
use safelens::store::ChangePoller;

use super::AppContext;

struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, notice: &CompletionNotice) {
        println!("\n  ✓ {} {}\n", notice.title, notice.body);
    }
}

pub async fn watch_command(ctx: &AppContext, poll_ms: u64) -> Result<()> {
    let session = ctx.require_session()?;

    // Baseline before the snapshot, so rows written in between get republished
    let mut poller = ChangePoller::new(
        (*ctx.tests).clone(),
        &session.user_id,
        Duration::from_millis(poll_ms),
    )
    .with_limit(ctx.config.store.recent_limit);
    poller.prime().await?;

    let mut runner = FeedRunner::new(&session.user_id, ctx.tests.clone(), Arc::new(ConsoleNotifier))
        .with_notice_delay(ctx.config.feed.notice_delay())
        .with_recent_limit(ctx.config.store.recent_limit);
    runner.attach().await?;

    let stats = runner.mirror().statistics();
    println!(
        "Watching {} tests ({} pending, {} processing, {} completed, {} failed). Ctrl-C to stop.",
        stats.total, stats.pending, stats.processing, stats.completed, stats.failed
    );

    let poller = poller.spawn();

    loop {
        tokio::select! {
            step = runner.step() => {
                if !step? {
                    break;
                }
                let stats = runner.mirror().statistics();
                println!(
                    "  {} pending, {} processing, {} completed, {} failed",
                    stats.pending, stats.processing, stats.completed, stats.failed
                );
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    poller.abort();
    runner.detach();
    runner.flush().await;
    Ok(())
}
