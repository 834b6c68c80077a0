//! Submit command implementation

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Args;

use safelens::dispatch::WebhookDispatcher;
use safelens::workflow::{SubmissionForm, SubmissionWorkflow};
use safelens::{Attachment, CorsMode, TestType};

use super::AppContext;

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Scan a single URL
    #[arg(long, conflicts_with_all = ["links", "file"])]
    pub url: Option<String>,

    /// Scan a batch of URLs
    #[arg(long, num_args = 1.., conflicts_with = "file")]
    pub links: Vec<String>,

    /// Upload a URL sheet (.xlsx, .xls, .csv)
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Test type: http, ssl, sensitive, cors, error, url
    #[arg(long = "test")]
    pub test_type: Option<String>,

    /// CORS mode: active or passive
    #[arg(long)]
    pub cors_mode: Option<String>,

    /// Origin to send with active CORS tests
    #[arg(long)]
    pub origin: Option<String>,

    /// Who receives the report (repeatable)
    #[arg(long = "recipient")]
    pub recipients: Vec<String>,
}

pub async fn submit_command(ctx: &AppContext, args: SubmitArgs) -> Result<()> {
    let mut form = build_form(args)?;

    let dispatcher = WebhookDispatcher::from_config(&ctx.config.webhook, ctx.profiles.clone());
    let mut workflow = SubmissionWorkflow::new(ctx.tests.clone(), Arc::new(dispatcher));

    let session = ctx.session();
    match workflow.submit(session.as_ref(), &mut form).await {
        Ok(outcome) => {
            println!("Security analysis initiated!");
            println!("  {}", outcome.message());
            if let Some(id) = &outcome.test_id {
                println!("  Test ID: {}", id);
            }
            Ok(())
        }
        Err(e) => bail!("[{}] {}", e.code(), e),
    }
}

fn build_form(args: SubmitArgs) -> Result<SubmissionForm> {
    let mut form = SubmissionForm::new();

    if let Some(url) = args.url {
        form.set_single_url(url);
    } else if !args.links.is_empty() {
        form.set_links(args.links);
    } else if let Some(path) = args.file {
        let attachment = Attachment::from_path(&path)?;
        if let Err(e) = form.attach_file(attachment) {
            bail!("[{}] {}", e.code(), e);
        }
    }

    if let Some(id) = args.test_type {
        let Some(test_type) = TestType::from_id(&id) else {
            bail!("Unknown test type: {} (expected one of http, ssl, sensitive, cors, error, url)", id);
        };
        form.toggle_test(test_type);
    }

    if let Some(mode) = args.cors_mode {
        let Some(mode) = CorsMode::from_str(&mode) else {
            bail!("Unknown CORS mode: {} (expected active or passive)", mode);
        };
        form.set_cors_mode(mode);
    }

    if let Some(origin) = args.origin {
        form.set_origin_url(origin);
    }

    form.recipients = args.recipients;
    Ok(form)
}
