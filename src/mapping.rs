use serde_json::Value;

use crate::domain::{DestinationRecord, Extra, FeedEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    Title,
    Url,
    Author,
    LicenseId,
}

impl RecordField {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordField::Title => "title",
            RecordField::Url => "url",
            RecordField::Author => "author",
            RecordField::LicenseId => "license_id",
        }
    }

    fn slot(self, record: &mut DestinationRecord) -> &mut Option<String> {
        match self {
            RecordField::Title => &mut record.title,
            RecordField::Url => &mut record.url,
            RecordField::Author => &mut record.author,
            RecordField::LicenseId => &mut record.license_id,
        }
    }
}

/// Destination field to feed field.
pub const FIELD_MAPPING: [(RecordField, &str); 4] = [
    (RecordField::Title, "title"),
    (RecordField::Url, "link"),
    (RecordField::Author, "author"),
    (RecordField::LicenseId, "rights"),
];

pub fn is_mapped_source(key: &str) -> bool {
    FIELD_MAPPING.iter().any(|(_, source)| *source == key)
}

/// Copies mapped feed fields onto the record. Absent source fields are skipped
/// and explicit nulls clear the field.
pub fn apply_mapping(entry: &FeedEntry, record: &mut DestinationRecord) {
    for (field, source) in FIELD_MAPPING {
        if let Some(value) = entry.get(source) {
            *field.slot(record) = (!value.is_null()).then(|| value_as_text(value));
        }
    }
}

/// Every feed field the mapping does not consume, in key order.
pub fn extract_extras(entry: &FeedEntry) -> Vec<Extra> {
    let mut extras: Vec<Extra> = entry
        .fields()
        .iter()
        .filter(|(key, _)| !is_mapped_source(key))
        .map(|(key, value)| Extra {
            key: key.clone(),
            value: normalize_extra(value),
        })
        .collect();
    extras.sort_by(|a, b| a.key.cmp(&b.key));
    extras
}

/// Lists reduce to their first element; falsy values become `None`.
pub fn normalize_extra(value: &Value) -> Option<Value> {
    let value = match value {
        Value::Array(items) => items.first()?,
        other => other,
    };
    (!is_falsy(value)).then(|| value.clone())
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
