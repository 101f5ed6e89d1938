//! Text rendering of table records for tool output.

use serde_json::Value as JsonValue;

use crate::store::Record;
use crate::vocabulary::{self, FieldKind};

/// Plain text of a field.
///
/// Understands the `{ "value", "display_value" }` objects returned with
/// `sysparm_display_value=all` and `{ "link", "value" }` reference objects,
/// preferring the raw value.
pub fn field_text(record: &Record, field: &str) -> Option<String> {
    scalar_text(record.get(field)?)
}

/// Display text of a field, falling back to the raw value.
pub fn display_text(record: &Record, field: &str) -> Option<String> {
    match record.get(field)? {
        JsonValue::Object(obj) => obj
            .get("display_value")
            .and_then(plain_text)
            .or_else(|| obj.get("value").and_then(plain_text)),
        other => plain_text(other),
    }
}

fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Object(obj) => obj.get("value").and_then(plain_text),
        other => plain_text(other),
    }
}

fn plain_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Label for an enumerated field, e.g. `"2"` -> `"In Progress"`.
///
/// Display values pass through; unknown codes are shown as-is.
fn enum_text(record: &Record, field: &str) -> Option<String> {
    let kind = FieldKind::for_field(field)?;
    let raw = field_text(record, field)?;
    match vocabulary::label(kind, &raw) {
        Some(label) => Some(label.to_string()),
        None => display_text(record, field).or(Some(raw)),
    }
}

/// One-line summary: `INC0010001 [state: In Progress, priority: Critical] Email down`.
pub fn summary_line(record: &Record) -> String {
    let number = display_text(record, "number").unwrap_or_else(|| "(no number)".to_string());

    let tags: Vec<String> = ["state", "priority"]
        .iter()
        .filter_map(|field| enum_text(record, field).map(|label| format!("{}: {}", field, label)))
        .collect();

    let mut line = number;
    if !tags.is_empty() {
        line.push_str(&format!(" [{}]", tags.join(", ")));
    }
    if let Some(description) = display_text(record, "short_description") {
        line.push(' ');
        line.push_str(&description);
    }
    line
}

/// Pretty JSON of a single record.
pub fn record_json(record: &Record) -> String {
    serde_json::to_string_pretty(record).unwrap_or_else(|_| format!("{:?}", record))
}

/// Pretty JSON array of records.
pub fn records_json(records: &[Record]) -> String {
    serde_json::to_string_pretty(records).unwrap_or_else(|_| format!("{:?}", records))
}
