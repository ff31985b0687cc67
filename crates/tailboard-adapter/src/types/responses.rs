/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust response structs with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::enums::QueryOp;
use super::models::{LogEntry, QueryMatch};

/// `{payload, next_url}` wrapper returned by the tailing endpoints.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub payload: Vec<PayloadItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_url: Option<String>,
}

impl Envelope {
    /// Entries in payload order. Items that are neither a line nor an entry are skipped.
    pub fn into_entries(self) -> Vec<LogEntry> {
        self.payload.into_iter().filter_map(PayloadItem::into_entry).collect()
    }
}

/// Topic tails send pre-formatted lines, task/event tails send structured entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadItem {
    Line(String),
    Entry(LogEntry),
    /// `null`, numbers, or objects that do not decode as an entry
    Other(Value),
}

impl PayloadItem {
    pub fn into_entry(self) -> Option<LogEntry> {
        match self {
            PayloadItem::Line(text) => Some(LogEntry::line(text)),
            PayloadItem::Entry(entry) => Some(entry),
            PayloadItem::Other(_) => None,
        }
    }
}

/// Parsed outcome of a `query.cgi` request.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResponse {
    /// Empty body or empty result list
    Empty,
    /// `[{"error": "..."}]`
    Error(String),
    /// Key listing for the `keys` operator, key to hit count
    Keys(BTreeMap<String, Value>),
    Matches(Vec<QueryMatch>),
}

impl QueryResponse {
    pub fn parse(op: QueryOp, body: &str) -> Result<Self, serde_json::Error> {
        if body.trim().is_empty() {
            return Ok(QueryResponse::Empty);
        }

        let items: Vec<Value> = serde_json::from_str(body)?;
        let Some(first) = items.first() else {
            return Ok(QueryResponse::Empty);
        };

        if let Some(error) = first.get("error") {
            let message = match error {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            return Ok(QueryResponse::Error(message));
        }

        if op == QueryOp::Keys {
            let keys = match first {
                Value::Object(map) => map.clone().into_iter().collect(),
                _ => BTreeMap::new(),
            };
            return Ok(QueryResponse::Keys(keys));
        }

        let matches = items
            .into_iter()
            .map(serde_json::from_value::<QueryMatch>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(QueryResponse::Matches(matches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_mixes_lines_and_entries() {
        let envelope: Envelope = serde_json::from_str(
            r#"{
                "payload": [
                    "plain line\n",
                    {"timestamp": 1000, "type": "TASK_BEGIN", "key": "k1", "value": "v1"}
                ],
                "next_url": "cgi-bin/tail.cgi/tasks/12/100"
            }"#,
        )
        .expect("envelope");

        assert_eq!(envelope.next_url.as_deref(), Some("cgi-bin/tail.cgi/tasks/12/100"));
        let entries = envelope.into_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].value, "plain line\n");
        assert!(entries[0].timestamp.is_none());
        assert_eq!(entries[1].key, "k1");
    }

    #[test]
    fn envelope_skips_undecodable_payload_items() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"payload": [null, "x", 7, {"key": "k"}], "next_url": "a"}"#)
                .expect("envelope");

        assert_eq!(envelope.next_url.as_deref(), Some("a"));
        let entries = envelope.into_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].value, "x");
        assert_eq!(entries[1].key, "k");
    }

    #[test]
    fn envelope_defaults_missing_fields() {
        let envelope: Envelope = serde_json::from_str("{}").expect("envelope");
        assert!(envelope.payload.is_empty());
        assert!(envelope.next_url.is_none());
    }

    #[test]
    fn query_response_recognises_error_payload() {
        let response =
            QueryResponse::parse(QueryOp::Eq, r#"[{"error": "no such index"}]"#).expect("parse");
        assert_eq!(response, QueryResponse::Error("no such index".to_string()));
    }

    #[test]
    fn query_response_treats_empty_as_no_results() {
        assert_eq!(QueryResponse::parse(QueryOp::Eq, "").expect("parse"), QueryResponse::Empty);
        assert_eq!(QueryResponse::parse(QueryOp::Eq, "[]").expect("parse"), QueryResponse::Empty);
    }

    #[test]
    fn query_response_reads_key_listing() {
        let response =
            QueryResponse::parse(QueryOp::Keys, r#"[{"a": 3, "b": 1}]"#).expect("parse");
        let QueryResponse::Keys(keys) = response else {
            panic!("expected key listing");
        };
        assert_eq!(keys.keys().cloned().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn query_response_rejects_malformed_json() {
        assert!(QueryResponse::parse(QueryOp::Eq, "[{").is_err());
    }
}
