use anyhow::{bail, Context, Result};
use clap::Parser;
use splitfix::{
    CopyManifest, Environment, EnvironmentCopier, FileStore, RunOptions, StoreConfig,
};
use tracing_subscriber::EnvFilter;

/// Collections copied wholesale, users first so the identity manifest
/// applies to everything that references them.
const COPY_COLLECTIONS: [&str; 8] = [
    "users",
    "categories",
    "locations",
    "recurring",
    "mail",
    "templates",
    "expenses",
    "settlements",
];

/// Expense fields holding user references that need remapping when
/// the target environment assigned different user keys.
const USER_REFERENCE_FIELDS: [&str; 1] = ["paidById"];

#[derive(Parser)]
#[command(name = "copy-environment")]
#[command(about = "Copy every collection from one environment into another")]
struct Cli {
    /// Source environment
    #[arg(long, value_enum, default_value_t = Environment::Production)]
    from: Environment,

    /// Target environment
    #[arg(long, value_enum, default_value_t = Environment::Staging)]
    to: Environment,

    /// Also port authentication principals (create-or-skip, existing
    /// target credentials are never overwritten)
    #[arg(long)]
    include_auth: bool,

    /// Skip the pre-run confirmation delay
    #[arg(long, short = 'y')]
    yes: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if cli.from == cli.to {
        bail!("source and target environments must differ");
    }

    let source = FileStore::open(&StoreConfig::for_environment(cli.from))
        .with_context(|| format!("cannot open the {} store", cli.from))?;
    let target = FileStore::open(&StoreConfig::for_environment(cli.to))
        .with_context(|| format!("cannot open the {} store", cli.to))?;

    let options = if cli.yes {
        RunOptions::confirmed()
    } else {
        RunOptions::default()
    };

    tracing::info!(from = %cli.from, to = %cli.to, "copying environment");
    let mut copier = EnvironmentCopier::new(source, target, options);
    copier.confirm();

    let manifest = CopyManifest::for_users(copier.source(), copier.target())
        .context("cannot build the users identity manifest")?;

    for collection in COPY_COLLECTIONS {
        let (manifest_ref, remap_fields): (Option<&CopyManifest>, &[&str]) = match collection {
            "users" => (Some(&manifest), &[]),
            "expenses" => (Some(&manifest), &USER_REFERENCE_FIELDS),
            _ => (None, &[]),
        };
        copier
            .copy_collection(collection, manifest_ref, remap_fields)
            .with_context(|| format!("copy of '{}' failed; safe to re-run", collection))?;
    }

    if cli.include_auth {
        let outcome = copier.copy_principals().context("principal port failed")?;
        tracing::info!(
            created = outcome.created,
            skipped = outcome.skipped,
            "principals ported"
        );
    }

    Ok(())
}
