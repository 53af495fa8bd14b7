//! Dataset documents.
//!
//! A document is one row of the source table: field name to value. One field
//! (the text source, e.g. tasting notes) is embedded; the rest are display
//! fields carried along as payload.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Parse a raw cell, preferring a number when the cell is numeric.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => FieldValue::Number(n),
            _ => FieldValue::Text(raw.to_string()),
        }
    }

    /// True for empty or whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Number(_) => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

/// One dataset row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: BTreeMap<String, FieldValue>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    /// Insert or replace a field.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Display string for a field, if present.
    pub fn text(&self, field: &str) -> Option<String> {
        self.fields.get(field).map(|v| v.to_string())
    }

    /// True when the field exists and is not blank.
    pub fn has_value(&self, field: &str) -> bool {
        self.fields.get(field).is_some_and(|v| !v.is_blank())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric_and_text() {
        assert_eq!(FieldValue::parse("96"), FieldValue::Number(96.0));
        assert_eq!(FieldValue::parse(" 4.5 "), FieldValue::Number(4.5));
        assert_eq!(
            FieldValue::parse("Saint Emilion"),
            FieldValue::Text("Saint Emilion".to_string())
        );
        // NaN and infinities stay text so payloads always serialize
        assert_eq!(FieldValue::parse("NaN"), FieldValue::Text("NaN".to_string()));
    }

    #[test]
    fn test_has_value() {
        let doc = Document::new()
            .with("name", "Chateau A")
            .with("variety", "  ")
            .with("rating", 97.0);

        assert!(doc.has_value("name"));
        assert!(!doc.has_value("variety"));
        assert!(!doc.has_value("notes"));
        assert!(doc.has_value("rating"));
    }

    #[test]
    fn test_text_display() {
        let doc = Document::new().with("rating", 97.0).with("name", "Chateau A");
        assert_eq!(doc.text("rating").as_deref(), Some("97"));
        assert_eq!(doc.text("name").as_deref(), Some("Chateau A"));
        assert_eq!(doc.text("missing"), None);
    }

    #[test]
    fn test_serializes_as_flat_object() {
        let doc = Document::new().with("name", "Chateau A").with("rating", 97.0);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Chateau A", "rating": 97.0}));

        let back: Document = serde_json::from_value(json).unwrap();
        assert_eq!(back, doc);
    }
}
