use std::collections::BTreeMap;

use crate::config::RunOptions;
use crate::core::{FieldValue, Result};
use crate::migrate::batch::BatchWriter;
use crate::migrate::orchestrator::confirmation_gate;
use crate::migrate::scanner::scan;
use crate::store::client::{StoreClient, WriteOp};

/// Precomputed identity mapping between environments for one
/// collection. Built before any write so the copy never interleaves
/// live lookups with writes.
#[derive(Debug, Clone)]
pub struct CopyManifest {
    pub collection: String,
    pub document_count: usize,
    /// Source document key to target document key.
    pub identity_map: BTreeMap<String, String>,
}

impl CopyManifest {
    /// Build the users manifest by matching authentication principals
    /// between environments on email address. A source user whose
    /// email has no target counterpart keeps its source key.
    pub fn for_users<S: StoreClient, T: StoreClient>(source: &S, target: &T) -> Result<Self> {
        let source_principals = source.list_principals()?;
        let target_by_email: BTreeMap<String, String> = target
            .list_principals()?
            .into_iter()
            .map(|p| (p.email, p.uid))
            .collect();

        let document_count = source_principals.len();
        let mut identity_map = BTreeMap::new();
        for principal in source_principals {
            if let Some(target_uid) = target_by_email.get(&principal.email) {
                if *target_uid != principal.uid {
                    identity_map.insert(principal.uid, target_uid.clone());
                }
            }
        }
        tracing::info!(
            principals = document_count,
            remapped = identity_map.len(),
            "identity manifest built"
        );
        Ok(Self {
            collection: "users".to_string(),
            document_count,
            identity_map,
        })
    }

    pub fn remap<'a>(&'a self, key: &'a str) -> &'a str {
        self.identity_map.get(key).map(String::as_str).unwrap_or(key)
    }
}

/// Outcome of copying one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOutcome {
    pub collection: String,
    pub documents_copied: u64,
    pub references_remapped: u64,
    pub batches_committed: u64,
}

/// Outcome of porting authentication principals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrincipalCopyOutcome {
    pub created: u64,
    pub skipped: u64,
}

/// Copies whole collections, by key, from a source store into a
/// target store. Writes use merge semantics so target fields absent
/// from the source document survive; batching follows the same bound
/// as the in-place repair path.
pub struct EnvironmentCopier<S: StoreClient, T: StoreClient> {
    source: S,
    target: T,
    options: RunOptions,
    confirmed: bool,
}

impl<S: StoreClient, T: StoreClient> EnvironmentCopier<S, T> {
    pub fn new(source: S, target: T, options: RunOptions) -> Self {
        Self {
            source,
            target,
            options,
            confirmed: false,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn into_target(self) -> T {
        self.target
    }

    /// Open the abort window once, before the first write of the
    /// session.
    pub fn confirm(&mut self) {
        if !self.confirmed {
            confirmation_gate(&self.options);
            self.confirmed = true;
        }
    }

    /// Copy one collection. When a manifest is supplied, document keys
    /// of the manifest's own collection and the named reference fields
    /// of every document are remapped through its identity map.
    pub fn copy_collection(
        &mut self,
        collection: &str,
        manifest: Option<&CopyManifest>,
        remap_fields: &[&str],
    ) -> Result<CopyOutcome> {
        self.confirm();
        let docs = scan(&self.source, collection)?;
        let documents_copied = docs.len() as u64;

        let mut references_remapped = 0u64;
        let mut writer = BatchWriter::new(&mut self.target);
        for doc in docs {
            let mut fields = doc.fields;
            if let Some(manifest) = manifest {
                for field in remap_fields {
                    if let Some(FieldValue::Text(reference)) = fields.get(*field) {
                        let mapped = manifest.remap(reference);
                        if mapped != reference {
                            let mapped = mapped.to_string();
                            fields.insert((*field).to_string(), FieldValue::Text(mapped));
                            references_remapped += 1;
                        }
                    }
                }
            }

            let key = match manifest {
                Some(manifest) if manifest.collection == collection => {
                    manifest.remap(&doc.key).to_string()
                }
                _ => doc.key,
            };

            writer.push(WriteOp::SetMerge {
                collection: collection.to_string(),
                key,
                fields,
            })?;
        }
        writer.flush()?;

        let outcome = CopyOutcome {
            collection: collection.to_string(),
            documents_copied,
            references_remapped,
            batches_committed: writer.batches_committed() as u64,
        };
        tracing::info!(
            collection = %outcome.collection,
            copied = outcome.documents_copied,
            remapped = outcome.references_remapped,
            batches = outcome.batches_committed,
            "collection copied"
        );
        Ok(outcome)
    }

    /// Port authentication principals, create-or-skip: a principal
    /// already present in the target is never overwritten.
    pub fn copy_principals(&mut self) -> Result<PrincipalCopyOutcome> {
        self.confirm();
        let mut outcome = PrincipalCopyOutcome::default();
        for principal in self.source.list_principals()? {
            let uid = principal.uid.clone();
            if self.target.create_principal(principal)? {
                tracing::info!(uid = %uid, "principal created");
                outcome.created += 1;
            } else {
                tracing::info!(uid = %uid, "principal already present, skipped");
                outcome.skipped += 1;
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::client::Principal;
    use crate::store::document::Document;
    use crate::store::memory::MemoryStore;

    fn principal(uid: &str, email: &str, name: &str) -> Principal {
        Principal {
            uid: uid.into(),
            email: email.into(),
            display_name: name.into(),
        }
    }

    #[test]
    fn test_manifest_maps_only_differing_keys() {
        let mut source = MemoryStore::new();
        source.insert_principal(principal("u1", "ada@example.com", "Ada"));
        source.insert_principal(principal("u2", "bob@example.com", "Bob"));

        let mut target = MemoryStore::new();
        target.insert_principal(principal("t9", "ada@example.com", "Ada"));
        target.insert_principal(principal("u2", "bob@example.com", "Bob"));

        let manifest = CopyManifest::for_users(&source, &target).unwrap();
        assert_eq!(manifest.document_count, 2);
        assert_eq!(manifest.remap("u1"), "t9");
        assert_eq!(manifest.remap("u2"), "u2");
        assert_eq!(manifest.remap("unknown"), "unknown");
    }

    #[test]
    fn test_copy_preserves_unrelated_target_fields() {
        let mut source = MemoryStore::new();
        source.insert("categories", Document::new("c1").with("name", "Food"));

        let mut target = MemoryStore::new();
        target.insert("categories", Document::new("c1").with("archived", true));

        let mut copier =
            EnvironmentCopier::new(source, target, RunOptions::confirmed());
        let outcome = copier.copy_collection("categories", None, &[]).unwrap();
        assert_eq!(outcome.documents_copied, 1);

        let doc = copier
            .target()
            .document("categories", "c1")
            .unwrap();
        assert_eq!(doc.field("name").and_then(|v| v.as_str()), Some("Food"));
        assert_eq!(doc.field("archived"), Some(&FieldValue::Boolean(true)));
    }

    #[test]
    fn test_principals_are_create_or_skip() {
        let mut source = MemoryStore::new();
        source.insert_principal(principal("u1", "ada@example.com", "Ada"));
        source.insert_principal(principal("u2", "bob@example.com", "Bob"));

        let mut target = MemoryStore::new();
        target.insert_principal(principal("u1", "ada@example.com", "Ada (staging)"));

        let mut copier =
            EnvironmentCopier::new(source, target, RunOptions::confirmed());
        let outcome = copier.copy_principals().unwrap();

        assert_eq!(
            outcome,
            PrincipalCopyOutcome {
                created: 1,
                skipped: 1
            }
        );
        assert_eq!(
            copier.target().principal("u1").unwrap().display_name,
            "Ada (staging)"
        );
    }
}
