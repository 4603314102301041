use std::error::Error;

use clap::Parser;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod config;
mod pipeline;

use config::TestgenConfig;

/// Generates unit tests for the functions changed in a pull request.
#[derive(Debug, Parser)]
#[command(name = "testgen", version)]
struct Cli {
    /// Repository slug, `owner/name`. Defaults to GITHUB_REPOSITORY.
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repo: String,

    /// Pull request number to analyze.
    #[arg(long)]
    pr: u64,

    /// GitHub token; overrides config and GITHUB_TOKEN.
    #[arg(long)]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // A .env file is optional; environment variables may come from CI.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let cfg = TestgenConfig::load()?;

    let default_filter = if cfg.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .expect("valid default log filter");
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let (owner, repo) = github_client::split_owner_repo(&cli.repo)?;
    let summary = pipeline::run(&owner, &repo, cli.pr, cli.token.as_deref(), &cfg).await?;

    tracing::info!(
        targets = summary.targets_found,
        generated = summary.tests_generated,
        files = summary.files_committed,
        commit = summary.commit_sha.as_deref().unwrap_or("-"),
        "run complete"
    );

    Ok(())
}
