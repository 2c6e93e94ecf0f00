use anyhow::{Context, Result};
use clap::Parser;
use splitfix::{
    rules, CollectionPlan, Environment, FileStore, Migration, RunOptions, StoreConfig,
};
use tracing_subscriber::EnvFilter;

/// Repair timestamp fields stored as plain seconds/nanoseconds maps.
#[derive(Parser)]
#[command(name = "fix-timestamps")]
#[command(about = "Repair timestamp fields stored as plain seconds/nanoseconds maps")]
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

    tracing::info!(environment = %cli.environment, "repairing timestamp fields");
    let mut migration = Migration::new(client, options)
        .plan(CollectionPlan::new(
            "expenses",
            rules::expense_timestamp_rules(),
        ))
        .plan(CollectionPlan::new(
            "settlements",
            rules::settlement_timestamp_rules(),
        ));

    match migration.run() {
        Ok(_) => Ok(()),
        Err(failure) => {
            failure.report.log_summary();
            Err(failure.error).context("timestamp repair aborted; safe to re-run")
        }
    }
}
