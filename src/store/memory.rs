//! In-memory store client, used by tests and fixtures. Keeps a ledger
//! of committed batch sizes so the batch bound is observable from the
//! outside, and can inject a commit failure to exercise the fatal
//! write path.

use std::collections::BTreeMap;

use crate::core::{FieldValue, MigrateError, Result};
use crate::store::client::{FieldWrite, Principal, StoreClient, WriteBatch, WriteOp};
use crate::store::document::Document;

type Fields = BTreeMap<String, FieldValue>;

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: BTreeMap<String, BTreeMap<String, Fields>>,
    principals: BTreeMap<String, Principal>,
    committed_batches: Vec<usize>,
    fail_next_commit: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, collection: &str, doc: Document) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(doc.key, doc.fields);
    }

    pub fn document(&self, collection: &str, key: &str) -> Option<Document> {
        let fields = self.collections.get(collection)?.get(key)?;
        Some(Document {
            key: key.to_string(),
            fields: fields.clone(),
        })
    }

    pub fn insert_principal(&mut self, principal: Principal) {
        self.principals.insert(principal.uid.clone(), principal);
    }

    pub fn principal(&self, uid: &str) -> Option<&Principal> {
        self.principals.get(uid)
    }

    /// Operation counts of every commit, in order.
    pub fn committed_batches(&self) -> &[usize] {
        &self.committed_batches
    }

    /// Make the next `commit` fail with a transient-style error.
    pub fn fail_next_commit(&mut self) {
        self.fail_next_commit = true;
    }

    fn apply(&mut self, op: WriteOp) {
        match op {
            WriteOp::Update {
                collection,
                key,
                fields,
            } => {
                let doc = self
                    .collections
                    .entry(collection)
                    .or_default()
                    .entry(key)
                    .or_default();
                for (name, write) in fields {
                    match write {
                        FieldWrite::Set(value) => {
                            doc.insert(name, value);
                        }
                        FieldWrite::Delete => {
                            doc.remove(&name);
                        }
                    }
                }
            }
            WriteOp::SetMerge {
                collection,
                key,
                fields,
            } => {
                let doc = self
                    .collections
                    .entry(collection)
                    .or_default()
                    .entry(key)
                    .or_default();
                for (name, value) in fields {
                    if value.is_null() {
                        doc.remove(&name);
                    } else {
                        doc.insert(name, value);
                    }
                }
            }
            WriteOp::Delete { collection, key } => {
                if let Some(docs) = self.collections.get_mut(&collection) {
                    docs.remove(&key);
                }
            }
        }
    }
}

impl StoreClient for MemoryStore {
    fn collection_snapshot(&self, collection: &str) -> Result<Vec<Document>> {
        let docs = match self.collections.get(collection) {
            Some(docs) => docs,
            None => return Ok(Vec::new()),
        };
        Ok(docs
            .iter()
            .map(|(key, fields)| Document {
                key: key.clone(),
                fields: fields.clone(),
            })
            .collect())
    }

    fn get(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        Ok(self.document(collection, key))
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<()> {
        if self.fail_next_commit {
            self.fail_next_commit = false;
            return Err(MigrateError::CommitFailed(
                "injected commit failure".to_string(),
            ));
        }
        self.committed_batches.push(batch.len());
        for op in batch.into_ops() {
            self.apply(op);
        }
        Ok(())
    }

    fn list_principals(&self) -> Result<Vec<Principal>> {
        Ok(self.principals.values().cloned().collect())
    }

    fn create_principal(&mut self, principal: Principal) -> Result<bool> {
        if self.principals.contains_key(&principal.uid) {
            return Ok(false);
        }
        self.principals.insert(principal.uid.clone(), principal);
        Ok(true)
    }
}
