use std::collections::{BTreeMap, BTreeSet};

use crate::migrate::report::FieldSkip;
use crate::rules::FieldRule;
use crate::store::client::FieldWrite;
use crate::store::document::Document;

/// All staged field mutations for one document. Consumed by the batch
/// writer, discarded after commit.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpdate {
    pub key: String,
    pub fields: BTreeMap<String, FieldWrite>,
}

/// Outcome of normalizing one document.
#[derive(Debug, Default)]
pub struct Normalized {
    /// `None` when the document is already canonical; it must not
    /// generate a write.
    pub update: Option<PendingUpdate>,
    /// Watched fields whose rule converted successfully, for the
    /// per-field report counters.
    pub fixed_fields: Vec<String>,
    /// Watched fields no rule matched, already canonical or absent.
    /// Logged so an operator can audit why a document was left alone.
    pub unmatched_fields: Vec<String>,
    pub skips: Vec<FieldSkip>,
}

/// Evaluates the configured rules against one document at a time.
///
/// Rules run in declaration order; the first rule whose `detect`
/// matches settles its field, whether conversion then succeeds or
/// fails. A conversion failure is recorded and the remaining fields of
/// the same document are still processed.
pub struct Normalizer {
    rules: Vec<Box<dyn FieldRule>>,
}

impl Normalizer {
    pub fn new(rules: Vec<Box<dyn FieldRule>>) -> Self {
        Self { rules }
    }

    pub fn normalize(&self, doc: &Document) -> Normalized {
        let mut out = Normalized::default();
        let mut staged: BTreeMap<String, FieldWrite> = BTreeMap::new();
        let mut settled: BTreeSet<&str> = BTreeSet::new();
        let mut watched: Vec<&str> = Vec::new();

        for rule in &self.rules {
            if !watched.contains(&rule.field()) {
                watched.push(rule.field());
            }
            if settled.contains(rule.field()) {
                continue;
            }
            if !rule.detect(doc) {
                continue;
            }
            settled.insert(rule.field());

            match rule.convert(doc) {
                Ok(patches) => {
                    tracing::info!(key = %doc.key, field = %rule.field(), "field converted");
                    out.fixed_fields.push(rule.field().to_string());
                    for patch in patches {
                        staged.insert(patch.field, patch.write);
                    }
                }
                Err(reason) => {
                    tracing::warn!(
                        key = %doc.key,
                        field = %rule.field(),
                        reason = %reason,
                        "conversion failed"
                    );
                    out.skips.push(FieldSkip {
                        key: doc.key.clone(),
                        field: rule.field().to_string(),
                        reason,
                    });
                }
            }
        }

        for field in watched {
            if settled.contains(field) {
                continue;
            }
            tracing::debug!(key = %doc.key, field = %field, "no rule matched");
            out.unmatched_fields.push(field.to_string());
        }

        if !staged.is_empty() {
            out.update = Some(PendingUpdate {
                key: doc.key.clone(),
                fields: staged,
            });
        }
        out
    }
}
