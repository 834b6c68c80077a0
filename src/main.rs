use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "safelens")]
#[command(about = "SafeLens - launch API security scans and track their status")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ~/.safelens/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Submit a scan to the automation webhook
    Submit(cli::submit::SubmitArgs),

    /// List recent tests
    Tests {
        /// Show only tests with this status
        #[arg(long)]
        status: Option<String>,

        /// Maximum number of tests to show
        #[arg(long)]
        limit: Option<usize>,

        /// Only completed tests whose notice has not been seen
        #[arg(long, conflicts_with = "status")]
        unread: bool,
    },

    /// Show test counts by status
    Stats,

    /// Follow test updates and announce completed scans
    Watch {
        /// How often to look for rows written by other processes
        #[arg(long, default_value_t = 2000)]
        poll_ms: u64,
    },

    /// Play the automation workflow's part for one test
    Simulate(cli::simulate::SimulateArgs),

    /// Manage the signed-in user's profile
    Profile {
        #[command(subcommand)]
        command: cli::profile::ProfileCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    if let Commands::Init { force } = cli.command {
        return cli::init::init_command(cli.config.as_deref(), force);
    }

    let ctx = cli::AppContext::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Init { .. } => {}
        Commands::Submit(args) => cli::submit::submit_command(&ctx, args).await?,
        Commands::Tests {
            status,
            limit,
            unread,
        } => cli::tests::tests_command(&ctx, status, limit, unread).await?,
        Commands::Stats => cli::tests::stats_command(&ctx).await?,
        Commands::Watch { poll_ms } => cli::watch::watch_command(&ctx, poll_ms).await?,
        Commands::Simulate(args) => cli::simulate::simulate_command(&ctx, args).await?,
        Commands::Profile { command } => cli::profile::profile_command(&ctx, command).await?,
    }

    Ok(())
}
