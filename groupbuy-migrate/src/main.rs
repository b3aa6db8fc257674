use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use groupbuy_migrate::{Cli, PassOptions, PassSummary, ReconciliationPass};
use groupbuy_store::{DbClient, PostgresOfferStore, Settings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "groupbuy_migrate=info,groupbuy_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("Reconciliation pass aborted: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<PassSummary> {
    let settings = Settings::load().context("Failed to load configuration")?;
    let options = cli.apply(PassOptions::from_settings(&settings));

    let client = DbClient::connect(&settings.database)
        .await
        .context("Failed to connect to offer storage")?;
    let store = Arc::new(PostgresOfferStore::from(client));

    let stdout = std::io::stdout();
    let summary = ReconciliationPass::new(store, options)
        .run(|outcome| writeln!(stdout.lock(), "{}", outcome))
        .await?;

    writeln!(stdout.lock(), "{}", summary)?;
    Ok(summary)
}
