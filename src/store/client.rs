//! The seam between the migration core and the backing document store.
//!
//! Everything the core needs from a store is behind [`StoreClient`]:
//! a full collection snapshot, point reads, an atomically committed
//! bounded write batch, and the authentication-principal listing used
//! by the environment copier. Production deployments put their SDK
//! client behind this trait; this crate ships an in-memory and a
//! file-backed implementation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{FieldValue, MigrateError, Result};
use crate::store::document::Document;

/// Maximum operation count the store accepts in one atomic batch.
pub const MAX_BATCH_OPERATIONS: usize = 500;

/// One field mutation inside an update. `Delete` removes the field
/// from the document (needed by renames).
#[derive(Debug, Clone, PartialEq)]
pub enum FieldWrite {
    Set(FieldValue),
    Delete,
}

/// One write operation against a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Patch individual fields of an existing document.
    Update {
        collection: String,
        key: String,
        fields: BTreeMap<String, FieldWrite>,
    },
    /// Merge-write a whole document: fields absent from the payload
    /// are preserved in the target, present fields are overwritten.
    SetMerge {
        collection: String,
        key: String,
        fields: BTreeMap<String, FieldValue>,
    },
    /// Remove a document.
    Delete { collection: String, key: String },
}

impl WriteOp {
    pub fn collection(&self) -> &str {
        match self {
            Self::Update { collection, .. }
            | Self::SetMerge { collection, .. }
            | Self::Delete { collection, .. } => collection,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Update { key, .. } | Self::SetMerge { key, .. } | Self::Delete { key, .. } => key,
        }
    }
}

/// An ordered set of write operations committed atomically.
///
/// Invariant: never holds more than [`MAX_BATCH_OPERATIONS`] operations.
#[derive(Debug, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) -> Result<()> {
        if self.ops.len() >= MAX_BATCH_OPERATIONS {
            return Err(MigrateError::BatchOverflow(MAX_BATCH_OPERATIONS));
        }
        self.ops.push(op);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Minimal authentication-identity record ported between environments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub uid: String,
    pub email: String,
    pub display_name: String,
}

/// Blocking document-store client.
pub trait StoreClient {
    /// Full snapshot of a named collection. An empty or absent
    /// collection yields an empty vec; an unreachable store is an
    /// error.
    fn collection_snapshot(&self, collection: &str) -> Result<Vec<Document>>;

    /// Point read of one document.
    fn get(&self, collection: &str, key: &str) -> Result<Option<Document>>;

    /// Commit a write batch atomically: either every operation
    /// applies or none does. An implementation may weaken this to
    /// per-collection atomicity when its storage cannot span
    /// collections in one write; it must document the weaker bound.
    fn commit(&mut self, batch: WriteBatch) -> Result<()>;

    /// All authentication principals known to this environment.
    fn list_principals(&self) -> Result<Vec<Principal>>;

    /// Create a principal unless one with the same uid exists.
    /// Returns `false` on skip; never overwrites existing credentials.
    fn create_principal(&mut self, principal: Principal) -> Result<bool>;
}
