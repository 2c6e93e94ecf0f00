use crate::core::{ConversionError, ConversionResult};
use crate::rules::{FieldPatch, FieldRule};
use crate::store::document::Document;

/// Moves a field from a deprecated name to its canonical name.
///
/// Three shapes occur: only the deprecated field (copy then delete),
/// both fields with equal values (a half-finished earlier rename;
/// delete the deprecated copy), and both fields with differing values
/// (ambiguous, reported as a conversion failure and left untouched).
pub struct RenameRule {
    deprecated: String,
    canonical: String,
}

impl RenameRule {
    pub fn new(deprecated: impl Into<String>, canonical: impl Into<String>) -> Self {
        Self {
            deprecated: deprecated.into(),
            canonical: canonical.into(),
        }
    }
}

impl FieldRule for RenameRule {
    fn field(&self) -> &str {
        &self.deprecated
    }

    fn detect(&self, doc: &Document) -> bool {
        doc.has_field(&self.deprecated)
    }

    fn convert(&self, doc: &Document) -> ConversionResult<Vec<FieldPatch>> {
        let value = doc.field(&self.deprecated).ok_or_else(|| {
            ConversionError::UnsupportedShape("deprecated field vanished".to_string())
        })?;

        match doc.field(&self.canonical) {
            None => Ok(vec![
                FieldPatch::set(self.canonical.clone(), value.clone()),
                FieldPatch::delete(self.deprecated.clone()),
            ]),
            Some(existing) if existing == value => {
                Ok(vec![FieldPatch::delete(self.deprecated.clone())])
            }
            Some(_) => Err(ConversionError::ConflictingRename {
                deprecated: self.deprecated.clone(),
                canonical: self.canonical.clone(),
            }),
        }
    }
}
