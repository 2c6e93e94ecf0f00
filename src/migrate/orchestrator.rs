use std::fmt;

use crate::config::RunOptions;
use crate::core::MigrateError;
use crate::migrate::batch::BatchWriter;
use crate::migrate::normalizer::Normalizer;
use crate::migrate::report::RunReport;
use crate::migrate::scanner::scan;
use crate::rules::FieldRule;
use crate::store::client::{StoreClient, WriteOp};

/// Phases of one migration run, in order. `AwaitingConfirmation` is
/// the only window in which the operator is expected to abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    AwaitingConfirmation,
    Scanning,
    Normalizing,
    Writing,
    Reporting,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::AwaitingConfirmation => "awaiting-confirmation",
            Self::Scanning => "scanning",
            Self::Normalizing => "normalizing",
            Self::Writing => "writing",
            Self::Reporting => "reporting",
            Self::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// One collection to repair and the rules to repair it with.
pub struct CollectionPlan {
    pub collection: String,
    pub rules: Vec<Box<dyn FieldRule>>,
}

impl CollectionPlan {
    pub fn new(collection: impl Into<String>, rules: Vec<Box<dyn FieldRule>>) -> Self {
        Self {
            collection: collection.into(),
            rules,
        }
    }
}

/// A fatal run error together with whatever report had accumulated
/// before the abort. The partial report is still worth showing: it
/// names every document already fixed, and re-running is safe.
#[derive(Debug)]
pub struct RunFailure {
    pub error: MigrateError,
    pub report: RunReport,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for RunFailure {}

/// Hold for the configured abort window before mutating a live
/// environment. No document is read or written while the gate is
/// open; an interrupt during the window aborts the whole process.
pub fn confirmation_gate(options: &RunOptions) {
    if options.skip_confirmation {
        tracing::info!("confirmation gate skipped");
        return;
    }
    tracing::warn!(
        delay = ?options.confirmation_delay,
        "about to mutate the store; interrupt now to abort"
    );
    std::thread::sleep(options.confirmation_delay);
}

/// Drives scanner, normalizer, and batch writer across one or more
/// collections, strictly in the supplied order and with no
/// parallelism: the batch bound has to be centrally tracked.
pub struct Migration<C: StoreClient> {
    client: C,
    plans: Vec<CollectionPlan>,
    options: RunOptions,
    phase: RunPhase,
}

impl<C: StoreClient> Migration<C> {
    pub fn new(client: C, options: RunOptions) -> Self {
        Self {
            client,
            plans: Vec::new(),
            options,
            phase: RunPhase::Idle,
        }
    }

    pub fn plan(mut self, plan: CollectionPlan) -> Self {
        self.plans.push(plan);
        self
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_client(self) -> C {
        self.client
    }

    fn enter(&mut self, phase: RunPhase) {
        self.phase = phase;
        tracing::info!(phase = %phase, "phase");
    }

    /// Run the whole migration. On a fatal error the partial report is
    /// preserved inside the failure.
    pub fn run(&mut self) -> Result<RunReport, RunFailure> {
        let mut report = RunReport::new();

        self.enter(RunPhase::AwaitingConfirmation);
        confirmation_gate(&self.options);

        let plans = std::mem::take(&mut self.plans);
        for plan in plans {
            self.enter(RunPhase::Scanning);
            let docs = match scan(&self.client, &plan.collection) {
                Ok(docs) => docs,
                Err(error) => return Err(RunFailure { error, report }),
            };
            report.documents_scanned += docs.len() as u64;

            self.enter(RunPhase::Normalizing);
            let normalizer = Normalizer::new(plan.rules);
            let mut updates = Vec::new();
            for doc in &docs {
                let normalized = normalizer.normalize(doc);
                for field in &normalized.fixed_fields {
                    report.record_fixed(field);
                }
                report.errors.extend(normalized.skips);
                match normalized.update {
                    Some(update) => {
                        report.documents_updated += 1;
                        updates.push(update);
                    }
                    None => report.documents_skipped += 1,
                }
            }

            self.enter(RunPhase::Writing);
            let mut writer = BatchWriter::new(&mut self.client);
            let mut write = || -> crate::core::Result<usize> {
                for update in updates.drain(..) {
                    writer.push(WriteOp::Update {
                        collection: plan.collection.clone(),
                        key: update.key,
                        fields: update.fields,
                    })?;
                }
                writer.flush()?;
                Ok(writer.batches_committed())
            };
            match write() {
                Ok(batches) => report.batches_committed += batches as u64,
                Err(error) => return Err(RunFailure { error, report }),
            }
        }

        self.enter(RunPhase::Reporting);
        report.log_summary();
        self.enter(RunPhase::Done);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::expense_amount_rules;
    use crate::store::document::Document;
    use crate::store::memory::MemoryStore;

    fn options() -> RunOptions {
        RunOptions::confirmed()
    }

    #[test]
    fn test_phase_reaches_done_on_success() {
        let mut store = MemoryStore::new();
        store.insert("expenses", Document::new("e1").with("amount", "3.50"));

        let mut migration = Migration::new(store, options()).plan(CollectionPlan::new(
            "expenses",
            expense_amount_rules(),
        ));
        let report = migration.run().unwrap();

        assert_eq!(migration.phase(), RunPhase::Done);
        assert_eq!(report.documents_updated, 1);
    }

    #[test]
    fn test_empty_collection_completes_with_empty_report() {
        let mut migration = Migration::new(MemoryStore::new(), options()).plan(
            CollectionPlan::new("expenses", expense_amount_rules()),
        );
        let report = migration.run().unwrap();

        assert_eq!(report.documents_scanned, 0);
        assert_eq!(report.documents_updated, 0);
        assert_eq!(report.batches_committed, 0);
    }

    #[test]
    fn test_commit_failure_preserves_partial_report() {
        let mut store = MemoryStore::new();
        store.insert("expenses", Document::new("e1").with("amount", "3.50"));
        store.fail_next_commit();

        let mut migration = Migration::new(store, options()).plan(CollectionPlan::new(
            "expenses",
            expense_amount_rules(),
        ));
        let failure = migration.run().unwrap_err();

        assert!(matches!(failure.error, MigrateError::CommitFailed(_)));
        assert_eq!(failure.report.documents_scanned, 1);
        assert_eq!(failure.report.per_field_fixed.get("amount"), Some(&1));
    }
}
