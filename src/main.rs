use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use auto_typer::{
    cli::Cli,
    completer_adapter::LlmCompleter,
    report,
    run::{self, RunOptions},
};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load environment variables from a .env file when one exists.
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn,auto_typer=info,typing_engine=info"))
        .context("building log filter")?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("installing log subscriber")?;

    let cli = Cli::parse();

    // Credential and provider selection are resolved once, here; a missing
    // API key is the one startup condition that aborts the whole run.
    let provider_cfg =
        llm_completion::config_from_env().context("loading completion provider config")?;
    let timeout = Duration::from_secs(provider_cfg.timeout_secs.unwrap_or(60));
    let client = llm_completion::CompletionClient::new(provider_cfg)
        .context("building completion client")?;
    let completer = Arc::new(LlmCompleter::new(client, timeout));

    let opts = RunOptions {
        path: cli.path.clone(),
        inplace: cli.inplace,
        format: cli.format.clone(),
        pretend: cli.pretend,
        jobs: cli.jobs,
        engine: cli.engine_config(),
    };

    let summary = run::run(opts, completer).await?;
    report::print_summary(&summary);

    Ok(if summary.exit_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
