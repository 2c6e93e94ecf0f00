use anyhow::{Context, Result};
use clap::Parser;
use splitfix::{
    rules, CollectionPlan, Environment, FileStore, Migration, RunOptions, StoreConfig,
};
use tracing_subscriber::EnvFilter;

/// Rename the legacy `paidByUserId` expense field to `paidById`.
#[derive(Parser)]
#[command(name = "rename-paid-by")]
#[command(about = "Rename the legacy paidByUserId expense field to paidById")]
struct Cli {
    /// Environment to repair
    #[arg(value_enum, default_value_t = Environment::Staging)]
    environment: Environment,

    /// Skip the pre-run confirmation delay
    #[arg(long, short = 'y')]
    yes: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = StoreConfig::for_environment(cli.environment);
    let client = FileStore::open(&config)
        .with_context(|| format!("cannot open the {} store", cli.environment))?;

    let options = if cli.yes {
        RunOptions::confirmed()
    } else {
        RunOptions::default()
    };

    tracing::info!(environment = %cli.environment, "renaming paidByUserId to paidById");
    let mut migration = Migration::new(client, options).plan(CollectionPlan::new(
        "expenses",
        rules::paid_by_rename_rules(),
    ));

    match migration.run() {
        Ok(_) => Ok(()),
        Err(failure) => {
            failure.report.log_summary();
            Err(failure.error).context("rename aborted; safe to re-run")
        }
    }
}
