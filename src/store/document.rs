use std::collections::BTreeMap;

use crate::core::FieldValue;

/// One keyed record with a dynamically-typed field map. A transient
/// in-memory copy; the store owns the durable data.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub key: String,
    pub fields: BTreeMap<String, FieldValue>,
}

impl Document {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter, handy for fixtures.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_accessors() {
        let doc = Document::new("e1").with("amount", 12.5).with("note", "taxi");

        assert_eq!(doc.key, "e1");
        assert!(doc.has_field("amount"));
        assert_eq!(doc.field("note").and_then(|v| v.as_str()), Some("taxi"));
        assert!(doc.field("missing").is_none());
    }

    #[test]
    fn test_remove() {
        let mut doc = Document::new("e1").with("legacy", 1i64);
        assert_eq!(doc.remove("legacy"), Some(FieldValue::Integer(1)));
        assert!(!doc.has_field("legacy"));
    }
}
