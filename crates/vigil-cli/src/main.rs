mod bootstrap_helpers;
mod cli_args;
mod report_render;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use vigil_gitlab::{GitlabApiClient, GitlabConfig};
use vigil_maintainers::{MaintainerActivityConfig, MaintainerActivityHandler};

use crate::{bootstrap_helpers::init_tracing, cli_args::Cli, report_render::render_report};

fn build_handler(cli: &Cli) -> Result<MaintainerActivityHandler> {
    let client = GitlabApiClient::new(GitlabConfig {
        api_base: cli.gitlab_api_base.clone(),
        token: cli.gitlab_token.clone().unwrap_or_default(),
        request_timeout_ms: cli.request_timeout_ms,
        retry_max_attempts: cli.retry_max_attempts,
        retry_base_delay_ms: cli.retry_base_delay_ms,
    })
    .context("failed to build gitlab client")?;

    let config = MaintainerActivityConfig::lookback(Utc::now(), cli.lookback_days)
        .with_min_access_level(cli.min_access_level)
        .with_page_size(cli.page_size)
        .with_job_scopes(cli.job_scopes());
    Ok(MaintainerActivityHandler::new(
        Arc::new(client),
        cli.project.clone(),
        config,
    ))
}

async fn run_cli(cli: Cli) -> Result<()> {
    let handler = build_handler(&cli)?;
    let report = handler
        .report()
        .await
        .with_context(|| format!("maintainer activity check failed for '{}'", cli.project))?;
    println!("{}", render_report(&report, cli.format)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run_cli(cli).await
}
