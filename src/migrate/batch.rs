use crate::core::{MigrateError, Result};
use crate::store::client::{StoreClient, WriteBatch, WriteOp, MAX_BATCH_OPERATIONS};

/// Accumulates write operations into size-bounded atomic batches.
///
/// Pushing into a full batch commits it and starts a fresh one before
/// the new operation is appended; `flush` commits a non-empty trailing
/// batch at the end of a run. A commit failure is fatal for the run --
/// re-running is safe because every staged conversion is idempotent.
pub struct BatchWriter<'a, C: StoreClient> {
    client: &'a mut C,
    batch: WriteBatch,
    ops_written: usize,
    batches_committed: usize,
}

impl<'a, C: StoreClient> BatchWriter<'a, C> {
    pub fn new(client: &'a mut C) -> Self {
        Self {
            client,
            batch: WriteBatch::new(),
            ops_written: 0,
            batches_committed: 0,
        }
    }

    pub fn push(&mut self, op: WriteOp) -> Result<()> {
        if self.batch.len() >= MAX_BATCH_OPERATIONS {
            self.commit_current()?;
        }
        self.batch.push(op)
    }

    pub fn flush(&mut self) -> Result<()> {
        if !self.batch.is_empty() {
            self.commit_current()?;
        }
        Ok(())
    }

    pub fn ops_written(&self) -> usize {
        self.ops_written
    }

    pub fn batches_committed(&self) -> usize {
        self.batches_committed
    }

    fn commit_current(&mut self) -> Result<()> {
        let batch = std::mem::take(&mut self.batch);
        let ops = batch.len();
        self.client.commit(batch).map_err(|e| match e {
            MigrateError::CommitFailed(_) => e,
            other => MigrateError::CommitFailed(other.to_string()),
        })?;
        self.ops_written += ops;
        self.batches_committed += 1;
        tracing::info!(
            ops,
            total = self.ops_written,
            batch = self.batches_committed,
            "write batch committed"
        );
        Ok(())
    }
}
