// ============================================================================
// Splitfix migration library
// ============================================================================
//
// Data-repair and cross-environment migration core for the splitfix
// expense ledger: scans document collections for structurally
// malformed records (timestamps stored as plain maps, amounts stored
// as strings, half-finished field renames), rewrites them in bounded
// atomic batches, and copies whole collections between environments.

pub mod config;
pub mod core;
pub mod migrate;
pub mod rules;
pub mod store;

// Re-export main types for convenience
pub use config::{Environment, RunOptions, ServiceAccountKey, StoreConfig, CONFIRMATION_DELAY};
pub use core::{ConversionError, FieldValue, MigrateError, Result};
pub use migrate::{
    BatchWriter, CollectionPlan, CopyManifest, CopyOutcome, EnvironmentCopier, FieldSkip,
    Migration, Normalizer, PendingUpdate, PrincipalCopyOutcome, RunFailure, RunPhase, RunReport,
};
pub use rules::{FieldPatch, FieldRule, RenameRule, StringAmountRule, TimestampMapRule};
pub use store::{
    Document, FieldWrite, FileStore, MemoryStore, Principal, StoreClient, WriteBatch, WriteOp,
    MAX_BATCH_OPERATIONS,
};
