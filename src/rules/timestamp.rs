use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};

use crate::core::{ConversionError, ConversionResult, FieldValue};
use crate::rules::{FieldPatch, FieldRule};
use crate::store::document::Document;

/// Repairs a timestamp serialized as a plain map of second/nanosecond
/// components. Both legacy spellings occur in the wild: the
/// underscore-prefixed `_seconds`/`_nanoseconds` and the bare
/// `seconds`/`nanoseconds`. A native timestamp never matches, so the
/// rule is a no-op on already-repaired documents.
pub struct TimestampMapRule {
    field: String,
}

impl TimestampMapRule {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

fn component(map: &BTreeMap<String, FieldValue>, prefixed: &str, bare: &str) -> Option<FieldValue> {
    map.get(prefixed).or_else(|| map.get(bare)).cloned()
}

impl FieldRule for TimestampMapRule {
    fn field(&self) -> &str {
        &self.field
    }

    fn detect(&self, doc: &Document) -> bool {
        // Any map on a schema-level timestamp field is timestamp-like;
        // convert decides whether it is actually repairable.
        matches!(doc.field(&self.field), Some(FieldValue::Map(_)))
    }

    fn convert(&self, doc: &Document) -> ConversionResult<Vec<FieldPatch>> {
        let map = doc
            .field(&self.field)
            .and_then(FieldValue::as_map)
            .ok_or_else(|| ConversionError::UnsupportedShape("expected a map".to_string()))?;

        let seconds = match component(map, "_seconds", "seconds") {
            Some(value) => value
                .as_i64()
                .ok_or_else(|| ConversionError::UnsupportedShape(format!(
                    "seconds component is {}, not an integer",
                    value.type_name()
                )))?,
            None => return Err(ConversionError::MissingTimestampParts),
        };

        let nanos = match component(map, "_nanoseconds", "nanoseconds") {
            Some(value) => {
                let n = value.as_i64().ok_or_else(|| {
                    ConversionError::UnsupportedShape(format!(
                        "nanoseconds component is {}, not an integer",
                        value.type_name()
                    ))
                })?;
                u32::try_from(n).map_err(|_| {
                    ConversionError::UnsupportedShape(format!(
                        "nanoseconds component {} is out of range",
                        n
                    ))
                })?
            }
            None => 0,
        };

        let instant = Utc
            .timestamp_opt(seconds, nanos)
            .single()
            .ok_or(ConversionError::TimestampOutOfRange(seconds))?;

        Ok(vec![FieldPatch::set(
            self.field.clone(),
            FieldValue::Timestamp(instant),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::client::FieldWrite;

    fn map_of(entries: &[(&str, i64)]) -> FieldValue {
        FieldValue::Map(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), FieldValue::Integer(*v)))
                .collect(),
        )
    }

    fn converted_instant(doc: &Document) -> chrono::DateTime<Utc> {
        let rule = TimestampMapRule::new("date");
        assert!(rule.detect(doc));
        let patches = rule.convert(doc).unwrap();
        assert_eq!(patches.len(), 1);
        match &patches[0].write {
            FieldWrite::Set(FieldValue::Timestamp(t)) => *t,
            other => panic!("expected a timestamp set, got {:?}", other),
        }
    }

    #[test]
    fn test_both_spellings_convert_to_the_same_instant() {
        let prefixed = Document::new("e1").with(
            "date",
            map_of(&[("_seconds", 1_700_000_000), ("_nanoseconds", 42)]),
        );
        let bare = Document::new("e2").with(
            "date",
            map_of(&[("seconds", 1_700_000_000), ("nanoseconds", 42)]),
        );
        assert_eq!(converted_instant(&prefixed), converted_instant(&bare));
    }

    #[test]
    fn test_missing_nanoseconds_defaults_to_zero() {
        let doc = Document::new("e1").with("date", map_of(&[("_seconds", 1_700_000_000)]));
        assert_eq!(
            converted_instant(&doc),
            Utc.timestamp_opt(1_700_000_000, 0).unwrap()
        );
    }

    #[test]
    fn test_missing_seconds_is_a_conversion_failure() {
        let rule = TimestampMapRule::new("date");
        let doc = Document::new("e1").with("date", map_of(&[("_nanoseconds", 5)]));
        assert!(rule.detect(&doc));
        assert_eq!(
            rule.convert(&doc),
            Err(ConversionError::MissingTimestampParts)
        );
    }

    #[test]
    fn test_native_timestamp_does_not_match() {
        let rule = TimestampMapRule::new("date");
        let doc = Document::new("e1").with(
            "date",
            FieldValue::Timestamp(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
        );
        assert!(!rule.detect(&doc));
    }

    #[test]
    fn test_absent_field_does_not_match() {
        let rule = TimestampMapRule::new("date");
        assert!(!rule.detect(&Document::new("e1")));
    }

    #[test]
    fn test_out_of_range_seconds_is_rejected() {
        let rule = TimestampMapRule::new("date");
        let doc = Document::new("e1").with("date", map_of(&[("_seconds", i64::MAX)]));
        assert_eq!(
            rule.convert(&doc),
            Err(ConversionError::TimestampOutOfRange(i64::MAX))
        );
    }
}
