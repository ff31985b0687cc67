/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust model structs with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::enums::EntryKind;

/// One record from a tailed log stream.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "RawLogEntry")]
pub struct LogEntry {
    /// Epoch seconds
    pub timestamp: Option<f64>,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub key: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
}

impl LogEntry {
    pub fn new(
        timestamp: f64,
        kind: impl Into<EntryKind>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Some(timestamp),
            kind: kind.into(),
            key: key.into(),
            value: value.into(),
            queue: None,
        }
    }

    /// A pre-formatted line as served by plain topic tails.
    pub fn line(text: impl Into<String>) -> Self {
        Self {
            value: text.into(),
            ..Self::default()
        }
    }
}

#[derive(Deserialize)]
struct RawLogEntry {
    #[serde(default)]
    timestamp: Option<Value>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    key: Option<Value>,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    payload: Option<Value>,
    #[serde(default)]
    queue: Option<String>,
}

impl From<RawLogEntry> for LogEntry {
    fn from(raw: RawLogEntry) -> Self {
        // `payload` is the older name for `value`.
        let value = match raw.value {
            Some(value) if !value.is_null() => Some(value),
            _ => raw.payload,
        };
        Self {
            timestamp: raw.timestamp.as_ref().and_then(epoch_seconds),
            kind: EntryKind::from(raw.kind.unwrap_or_default()),
            key: raw.key.map(value_text).unwrap_or_default(),
            value: value.map(value_text).unwrap_or_default(),
            queue: raw.queue.filter(|queue| !queue.is_empty()),
        }
    }
}

/// A message waiting in a named queue (`GET /fetch/<queue>`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueueMessage {
    #[serde(default, deserialize_with = "text_or_json")]
    pub message_stream: String,
    #[serde(default, deserialize_with = "text_or_json")]
    pub message_payload: String,
    #[serde(default)]
    pub message_timestamp: f64,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub next_attempt: f64,
}

/// Queue name and depth (`GET /fetch`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueSummary {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

/// A single hit returned by `query.cgi`.
///
/// Index queries on task/event topics nest the full entry inside `value`;
/// other topics return the entry fields at the top level.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryMatch {
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Value,
}

impl QueryMatch {
    pub fn into_entry(self) -> LogEntry {
        let nested = self
            .value
            .as_object()
            .is_some_and(|object| object.contains_key("type") || object.contains_key("timestamp"));

        if nested {
            let mut entry: LogEntry = serde_json::from_value(self.value).unwrap_or_default();
            if entry.timestamp.is_none() {
                entry.timestamp = self.timestamp;
            }
            if entry.key.is_empty() {
                entry.key = self.key.unwrap_or_default();
            }
            return entry;
        }

        LogEntry {
            timestamp: self.timestamp,
            kind: EntryKind::from(self.kind.unwrap_or_default()),
            key: self.key.unwrap_or_default(),
            value: value_text(self.value),
            queue: None,
        }
    }
}

fn epoch_seconds(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn value_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text,
        other => other.to_string(),
    }
}

fn text_or_json<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(value_text)
}
