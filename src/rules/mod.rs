//! Malformed-field detection and repair rules.
//!
//! Each rule pairs a total, side-effect-free `detect` with a `convert`
//! that either produces the canonical replacement or signals a
//! conversion failure. Rules are evaluated in declaration order and
//! the first matching rule wins for its field. A field that is already
//! canonical matches no rule, which is what makes a repair pass
//! idempotent.

mod amount;
mod rename;
mod timestamp;

pub use amount::StringAmountRule;
pub use rename::RenameRule;
pub use timestamp::TimestampMapRule;

use crate::core::{ConversionResult, FieldValue};
use crate::store::client::FieldWrite;
use crate::store::document::Document;

/// One staged field mutation produced by a rule.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPatch {
    pub field: String,
    pub write: FieldWrite,
}

impl FieldPatch {
    pub fn set(field: impl Into<String>, value: FieldValue) -> Self {
        Self {
            field: field.into(),
            write: FieldWrite::Set(value),
        }
    }

    pub fn delete(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            write: FieldWrite::Delete,
        }
    }
}

/// A predicate/converter pair for one malformed-field pattern.
///
/// `detect` sees the whole document because the rename rule's guard
/// ("canonical name absent") is a cross-field predicate; every other
/// rule only inspects its own field. `convert` is only called after
/// `detect` returned true and may still fail on a value that looked
/// repairable but is not.
pub trait FieldRule: Send + Sync {
    /// The field this rule watches (and the report bucket its fixes
    /// are counted under).
    fn field(&self) -> &str;

    fn detect(&self, doc: &Document) -> bool;

    fn convert(&self, doc: &Document) -> ConversionResult<Vec<FieldPatch>>;
}

/// Timestamp repairs for the `expenses` collection.
pub fn expense_timestamp_rules() -> Vec<Box<dyn FieldRule>> {
    vec![
        Box::new(TimestampMapRule::new("date")),
        Box::new(TimestampMapRule::new("createdAt")),
        Box::new(TimestampMapRule::new("updatedAt")),
    ]
}

/// Timestamp repairs for the `settlements` collection.
pub fn settlement_timestamp_rules() -> Vec<Box<dyn FieldRule>> {
    vec![
        Box::new(TimestampMapRule::new("date")),
        Box::new(TimestampMapRule::new("createdAt")),
    ]
}

/// String-typed amount repair for the `expenses` collection.
pub fn expense_amount_rules() -> Vec<Box<dyn FieldRule>> {
    vec![Box::new(StringAmountRule::new("amount"))]
}

/// Legacy `paidByUserId` to canonical `paidById` rename on `expenses`.
pub fn paid_by_rename_rules() -> Vec<Box<dyn FieldRule>> {
    vec![Box::new(RenameRule::new("paidByUserId", "paidById"))]
}
