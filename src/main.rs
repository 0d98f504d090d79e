use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    llms_harvest::logging::init().context("init logging")?;

    let cli = llms_harvest::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        llms_harvest::cli::Command::Run(args) => {
            llms_harvest::harvest::run(args).await.context("harvest")?;
        }
        llms_harvest::cli::Command::Collections(args) => {
            llms_harvest::collections::run(args)
                .await
                .context("collections")?;
        }
    }

    Ok(())
}
