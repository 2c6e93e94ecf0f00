use std::collections::BTreeMap;

use crate::core::ConversionError;

/// One field the normalizer had to leave alone, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSkip {
    pub key: String,
    pub field: String,
    pub reason: ConversionError,
}

/// Aggregated outcome of one migration run. Built incrementally,
/// rendered to the console at the end; never persisted by the core.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub per_field_fixed: BTreeMap<String, u64>,
    pub documents_scanned: u64,
    pub documents_updated: u64,
    pub documents_skipped: u64,
    pub batches_committed: u64,
    pub errors: Vec<FieldSkip>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fixed(&mut self, field: &str) {
        *self.per_field_fixed.entry(field.to_string()).or_default() += 1;
    }

    pub fn merge(&mut self, other: RunReport) {
        for (field, count) in other.per_field_fixed {
            *self.per_field_fixed.entry(field).or_default() += count;
        }
        self.documents_scanned += other.documents_scanned;
        self.documents_updated += other.documents_updated;
        self.documents_skipped += other.documents_skipped;
        self.batches_committed += other.batches_committed;
        self.errors.extend(other.errors);
    }

    /// Render the human-readable summary. The report itself stays the
    /// source of truth; this is the replaceable console view of it.
    pub fn log_summary(&self) {
        tracing::info!(
            scanned = self.documents_scanned,
            updated = self.documents_updated,
            skipped = self.documents_skipped,
            batches = self.batches_committed,
            "run summary"
        );
        for (field, fixed) in &self.per_field_fixed {
            tracing::info!(field = %field, fixed = *fixed, "field fixes");
        }
        for skip in &self.errors {
            tracing::warn!(
                key = %skip.key,
                field = %skip.field,
                reason = %skip.reason,
                "field left untouched"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_adds_counts_and_errors() {
        let mut a = RunReport::new();
        a.record_fixed("date");
        a.documents_scanned = 3;
        a.documents_updated = 1;

        let mut b = RunReport::new();
        b.record_fixed("date");
        b.record_fixed("amount");
        b.documents_scanned = 2;
        b.documents_skipped = 1;
        b.errors.push(FieldSkip {
            key: "e9".into(),
            field: "amount".into(),
            reason: crate::core::ConversionError::NotANumber("x".into()),
        });

        a.merge(b);
        assert_eq!(a.per_field_fixed.get("date"), Some(&2));
        assert_eq!(a.per_field_fixed.get("amount"), Some(&1));
        assert_eq!(a.documents_scanned, 5);
        assert_eq!(a.documents_updated, 1);
        assert_eq!(a.documents_skipped, 1);
        assert_eq!(a.errors.len(), 1);
    }
}
