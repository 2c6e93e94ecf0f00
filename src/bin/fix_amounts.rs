use anyhow::{Context, Result};
use clap::Parser;
use splitfix::{
    rules, CollectionPlan, Environment, FileStore, Migration, RunOptions, StoreConfig,
};
use tracing_subscriber::EnvFilter;

/// Repair expense amounts stored as strings.
#[derive(Parser)]
#[command(name = "fix-amounts")]
#[command(about = "Repair expense amounts stored as strings instead of numbers")]
struct Cli {
    /// Environment to repair (required: this rewrites money fields)
    #[arg(value_enum)]
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

    tracing::info!(environment = %cli.environment, "repairing string-typed amounts");
    let mut migration = Migration::new(client, options).plan(CollectionPlan::new(
        "expenses",
        rules::expense_amount_rules(),
    ));

    match migration.run() {
        Ok(_) => Ok(()),
        Err(failure) => {
            failure.report.log_summary();
            Err(failure.error).context("amount repair aborted; safe to re-run")
        }
    }
}
