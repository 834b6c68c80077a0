//! Simulate command implementation
//!
//! Writes the updates the automation workflow would write, so the feed and
//! notices can be exercised without a live webhook.

use std::time::Duration;

use anyhow::{Result, bail};
use clap::Args;

use safelens::store::TestStore;
use safelens::{ProcessorUpdate, TestResultSummary};

use super::AppContext;

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Test to advance
    pub test_id: String,

    /// Finish as failed instead of completed
    #[arg(long)]
    pub fail: bool,

    /// Pause between progress steps
    #[arg(long, default_value_t = 1000)]
    pub step_ms: u64,

    /// Vulnerabilities to report on completion
    #[arg(long, default_value_t = 0)]
    pub findings: u32,

    /// Report link attached on completion
    #[arg(long)]
    pub report_url: Option<String>,
}

pub async fn simulate_command(ctx: &AppContext, args: SimulateArgs) -> Result<()> {
    let session = ctx.require_session()?;
    let Some(test) = ctx.tests.get(&session.user_id, &args.test_id).await? else {
        bail!("Test {} not found", args.test_id);
    };

    let delay = Duration::from_millis(args.step_ms);
    for progress in [25u8, 50, 75] {
        if progress < test.progress {
            continue;
        }
        let updated = ctx
            .tests
            .apply_processor_update(&test.id, ProcessorUpdate::processing(progress))?;
        println!("  {} [{}] {}%", updated.id, updated.status, updated.progress);
        tokio::time::sleep(delay).await;
    }

    let last = if args.fail {
        ProcessorUpdate::failed("Simulated scan failure")
    } else {
        let summary = TestResultSummary {
            total_urls: Some(test.urls.len() as u32),
            vulnerabilities_found: Some(args.findings),
            high: Some(args.findings),
            ..Default::default()
        };
        let update = ProcessorUpdate::completed(summary)
            .with_email_sent(!test.recipient_emails.is_empty());
        match args.report_url {
            Some(url) => update.with_report_url(url),
            None => update,
        }
    };

    let finished = ctx.tests.apply_processor_update(&test.id, last)?;
    println!("  {} [{}] {}%", finished.id, finished.status, finished.progress);
    Ok(())
}
