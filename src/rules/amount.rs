use crate::core::{ConversionError, ConversionResult, FieldValue};
use crate::rules::{FieldPatch, FieldRule};
use crate::store::document::Document;

/// Repairs a numeric amount serialized as a string. Values that are
/// already numeric never match, so re-running is a no-op.
pub struct StringAmountRule {
    field: String,
}

impl StringAmountRule {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl FieldRule for StringAmountRule {
    fn field(&self) -> &str {
        &self.field
    }

    fn detect(&self, doc: &Document) -> bool {
        matches!(doc.field(&self.field), Some(FieldValue::Text(_)))
    }

    fn convert(&self, doc: &Document) -> ConversionResult<Vec<FieldPatch>> {
        let raw = doc
            .field(&self.field)
            .and_then(FieldValue::as_str)
            .ok_or_else(|| ConversionError::UnsupportedShape("expected a string".to_string()))?;

        let parsed: f64 = raw
            .trim()
            .parse()
            .map_err(|_| ConversionError::NotANumber(raw.to_string()))?;
        if !parsed.is_finite() {
            return Err(ConversionError::NotANumber(raw.to_string()));
        }

        Ok(vec![FieldPatch::set(
            self.field.clone(),
            FieldValue::Float(parsed),
        )])
    }
}
