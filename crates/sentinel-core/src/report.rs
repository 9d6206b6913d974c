//! Deterministic report rendering.
//!
//! Everything here is pure: canonical JSON text, artifact bodies and the
//! console summary are computed from a [`StructuredResult`] and a
//! [`ReportLayout`]. The runtime crate decides where the bytes go.

use serde_json::{Map, Value};

use crate::result::StructuredResult;
use crate::schema::SchemaSpec;
use crate::stage::{ArtifactSource, ArtifactSpec, ReportLayout};

/// Text used for absent values.
pub const MISSING: &str = "N/A";

/// Recursively rebuild `value` with object keys in sorted order.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let sorted: Map<String, Value> = keys
                .into_iter()
                .map(|k| (k.clone(), canonicalize(&map[k])))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Canonical JSON text: sorted keys, two-space indentation, trailing newline.
pub fn canonical_json(value: &Value) -> Result<String, serde_json::Error> {
    let mut text = serde_json::to_string_pretty(&canonicalize(value))?;
    text.push('\n');
    Ok(text)
}

/// The JSON persisted for a result: the value itself, or the schema-shaped
/// empty record for the sentinel.
pub fn report_document(result: &StructuredResult, schema: &SchemaSpec) -> Value {
    match result {
        StructuredResult::Populated(value) => value.clone(),
        StructuredResult::Empty => schema.empty_instance(),
    }
}

/// Plain-text form of a JSON value for console and template output.
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => MISSING.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Replace `{name}` placeholders with fields of `source`.
///
/// Unknown or absent fields render as [`MISSING`]. Unterminated braces are
/// copied through unchanged.
pub fn fill_template(template: &str, source: Option<&Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                out.push_str(&display_value(source.and_then(|v| v.get(name))));
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Body of an artifact for a populated result.
///
/// Returns the text and, when the designated field is missing or not a
/// string, a diagnostic describing why the body is empty.
pub fn render_artifact(artifact: &ArtifactSpec, value: &Value) -> (String, Option<String>) {
    match &artifact.source {
        ArtifactSource::Field(field) => match value.get(field) {
            Some(Value::String(text)) => (text.clone(), None),
            Some(_) => (
                String::new(),
                Some(format!("field '{}' is not a string", field)),
            ),
            None => (String::new(), Some(format!("field '{}' is missing", field))),
        },
        ArtifactSource::Template(template) => (fill_template(template, Some(value)), None),
    }
}

/// Human-readable rendering: summary line, optional forecast line, then
/// flagged items in result order.
pub fn render_summary(result: &StructuredResult, layout: &ReportLayout) -> String {
    let value = result.value();
    let mut lines = Vec::new();

    lines.push(format!(
        "Summary: {}",
        display_value(value.and_then(|v| v.get(&layout.summary_field)))
    ));

    if let Some(forecast) = &layout.forecast {
        lines.push(format!(
            "{}: {}",
            forecast.label,
            display_value(value.and_then(|v| v.get(&forecast.field)))
        ));
    }

    if let Some(list) = &layout.items {
        lines.push(format!("{}:", list.heading));
        let items = value
            .and_then(|v| v.get(&list.field))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        if items.is_empty() {
            lines.push("  (none)".to_string());
        }
        for (index, item) in items.iter().enumerate() {
            let text = match item {
                Value::Object(_) => fill_template(&list.item_template, Some(item)),
                other => display_value(Some(other)),
            };
            lines.push(format!("  {}. {}", index + 1, text));
        }
    }

    lines.join("\n")
}
