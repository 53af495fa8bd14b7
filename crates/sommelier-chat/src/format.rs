//! Turning search hits into the text the model and the user see.
//!
//! Everything here is a pure function of its inputs.

use std::fmt::Write as _;

use sommelier_types::Document;
use sommelier_vector::SearchHit;

/// Which payload fields to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFields {
    /// Field used as the entry heading
    pub key: String,
    /// Fields listed under the heading, after the score
    pub details: Vec<String>,
}

impl Default for DisplayFields {
    fn default() -> Self {
        Self {
            key: "name".to_string(),
            details: vec!["region".to_string(), "notes".to_string()],
        }
    }
}

/// Search results keyed by display key, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultMap {
    entries: Vec<(String, Vec<(String, String)>)>,
}

impl ResultMap {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&[(String, String)]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, fields)| fields.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// A later value for an existing key replaces it in place.
    fn insert(&mut self, key: String, fields: Vec<(String, String)>) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = fields,
            None => self.entries.push((key, fields)),
        }
    }

    /// `key:` then one tab-indented `sub_key: value` line per field.
    pub fn to_indented_text(&self) -> String {
        let mut out = String::new();
        for (key, fields) in &self.entries {
            push_entry(&mut out, key, fields);
        }
        finish(out)
    }
}

fn field(payload: &Document, name: &str) -> String {
    payload.text(name).unwrap_or_default()
}

fn format_score(score: f32) -> String {
    format!("{:.3}", score)
}

fn entry_fields(hit: &SearchHit, fields: &DisplayFields) -> Vec<(String, String)> {
    std::iter::once(("score".to_string(), format_score(hit.score)))
        .chain(
            fields
                .details
                .iter()
                .map(|d| (d.clone(), field(&hit.payload, d))),
        )
        .collect()
}

fn push_entry(out: &mut String, key: &str, fields: &[(String, String)]) {
    let _ = writeln!(out, "{}:", key);
    for (sub_key, value) in fields {
        let _ = writeln!(out, "\t{}: {}", sub_key, value);
    }
}

fn finish(mut out: String) -> String {
    if out.ends_with('\n') {
        out.pop();
    }
    out
}

/// Collapse hits into a [`ResultMap`]; duplicate keys keep the later hit.
pub fn to_mapping(hits: &[SearchHit], fields: &DisplayFields) -> ResultMap {
    let mut map = ResultMap::default();
    for hit in hits {
        map.insert(field(&hit.payload, &fields.key), entry_fields(hit, fields));
    }
    map
}

/// Indented text with one block per hit, duplicates included.
pub fn to_text(hits: &[SearchHit], fields: &DisplayFields) -> String {
    let mut out = String::new();
    for hit in hits {
        push_entry(&mut out, &field(&hit.payload, &fields.key), &entry_fields(hit, fields));
    }
    finish(out)
}

/// `<name> <region> score: <s>` per hit.
pub fn to_summary_lines(hits: &[SearchHit]) -> Vec<String> {
    hits.iter()
        .map(|hit| {
            format!(
                "{} {} score: {}",
                field(&hit.payload, "name"),
                field(&hit.payload, "region"),
                format_score(hit.score)
            )
        })
        .collect()
}
