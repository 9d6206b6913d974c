//! Structured results returned by the extraction client.

use serde_json::Value;

/// Outcome of one structured-extraction call.
///
/// `Empty` is the sentinel for exhausted retries. It is a value, not an
/// error: callers render and persist it like any other result.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredResult {
    /// Parsed JSON returned by the remote service
    Populated(Value),

    /// No data: every attempt failed
    Empty,
}

impl StructuredResult {
    /// True for the sentinel.
    pub fn is_empty(&self) -> bool {
        matches!(self, StructuredResult::Empty)
    }

    /// The parsed value, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            StructuredResult::Populated(value) => Some(value),
            StructuredResult::Empty => None,
        }
    }

    /// Look up a top-level field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.value().and_then(|v| v.get(name))
    }

    /// Look up a top-level string field.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }
}

impl From<Value> for StructuredResult {
    fn from(value: Value) -> Self {
        StructuredResult::Populated(value)
    }
}
