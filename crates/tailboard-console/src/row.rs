/*
[INPUT]:  LogEntry / QueueMessage / QueueSummary values from the adapter
[OUTPUT]: Immutable display-ready rows (escaped text, formatted time, style)
[POS]:    Presentation data layer shared by buffer, renderer and TUI
[UPDATE]: When adding columns, row styles, or escaping rules
*/

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::form_urlencoded;

use tailboard_adapter::{LogEntry, QueryClause, QueryRequest, QueueMessage, QueueSummary};

use crate::view::{EVENT_LOG_TOPIC, TASK_LOG_TOPIC};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const QUEUE_BACKLOG_WARN: u64 = 1000;
/// Index looked up when following a key.
pub const KEY_INDEX: &str = "ID";

/// Time zone used when formatting epoch timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampZone {
    #[default]
    Local,
    Utc,
}

impl TimestampZone {
    pub fn format(&self, epoch_seconds: f64) -> String {
        if !epoch_seconds.is_finite() {
            return String::new();
        }
        let secs = epoch_seconds.floor();
        let nanos = ((epoch_seconds - secs) * 1_000_000_000.0) as u32;
        let Some(utc) = DateTime::<Utc>::from_timestamp(secs as i64, nanos) else {
            return String::new();
        };
        match self {
            TimestampZone::Local => utc.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string(),
            TimestampZone::Utc => utc.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

/// Row styling derived from the entry type (or queue state).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStyle {
    Error,
    Output,
    Lifecycle,
    Plain,
    Retrying,
    Attempted,
    Waiting,
}

impl RowStyle {
    pub fn css_class(&self) -> Option<&'static str> {
        match self {
            RowStyle::Error => Some("task-error"),
            RowStyle::Output => Some("task-output"),
            RowStyle::Lifecycle => Some("task-begin-complete"),
            RowStyle::Plain => None,
            RowStyle::Retrying => Some("queue-retrying"),
            RowStyle::Attempted => Some("queue-attempted"),
            RowStyle::Waiting => Some("queue-waiting"),
        }
    }
}

/// Backend-supplied text in both output media.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisplayText {
    html: String,
    plain: String,
}

impl DisplayText {
    pub fn new(raw: &str) -> Self {
        Self {
            html: escape_html(raw),
            plain: terminal_safe(raw),
        }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn plain(&self) -> &str {
        &self.plain
    }
}

/// Drill-down target behind a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowLink {
    /// Exact lookup of `key` on the `ID` index of `topic`.
    Query { topic: String, key: String },
    /// Messages held by one queue.
    Queue(String),
}

impl RowLink {
    /// `None` for rows without a key.
    pub fn query(topic: &str, key: &str) -> Option<Self> {
        (!key.is_empty()).then(|| RowLink::Query {
            topic: topic.to_string(),
            key: key.to_string(),
        })
    }

    /// Dashboard page for this target, relative to the HTML output.
    pub fn href(&self) -> String {
        let mut params = form_urlencoded::Serializer::new(String::new());
        let page = match self {
            RowLink::Query { topic, key } => {
                let page = match topic.as_str() {
                    TASK_LOG_TOPIC => "task_query.html",
                    EVENT_LOG_TOPIC => "event_query.html",
                    _ => {
                        params.append_pair("topic", topic);
                        "query.html"
                    }
                };
                params.append_pair("key", key);
                page
            }
            RowLink::Queue(name) => {
                params.append_pair("queue", name);
                "queue.html"
            }
        };
        format!("{page}?{}", params.finish())
    }

    /// Query behind a key link.
    pub fn query_request(&self) -> Option<QueryRequest> {
        match self {
            RowLink::Query { topic, key } => Some(key_lookup(topic, key)),
            RowLink::Queue(_) => None,
        }
    }
}

/// Exact lookup of `key` on the `ID` index of `topic`.
pub fn key_lookup(topic: &str, key: &str) -> QueryRequest {
    QueryRequest::Single(QueryClause::lookup(QueryClause::index_field(topic, KEY_INDEX), key))
}

impl std::fmt::Display for RowLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowLink::Query { topic, key } => write!(f, "{topic} {key}"),
            RowLink::Queue(name) => write!(f, "queue {name}"),
        }
    }
}

/// A display-ready row. Never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRow {
    pub style: RowStyle,
    pub timestamp: String,
    pub kind: DisplayText,
    pub queue: DisplayText,
    pub key: DisplayText,
    pub value: DisplayText,
    pub attempts: Option<u32>,
    pub next_attempt: String,
    pub link: Option<RowLink>,
}

impl RenderedRow {
    pub fn from_entry(entry: &LogEntry, zone: TimestampZone) -> Self {
        let style = if entry.kind.is_output() {
            RowStyle::Output
        } else if entry.kind.is_lifecycle() {
            RowStyle::Lifecycle
        } else if matches!(entry.kind, tailboard_adapter::EntryKind::Error(_)) {
            RowStyle::Error
        } else {
            RowStyle::Plain
        };

        Self {
            style,
            timestamp: entry.timestamp.map(|ts| zone.format(ts)).unwrap_or_default(),
            kind: DisplayText::new(entry.kind.label()),
            queue: DisplayText::new(entry.queue.as_deref().unwrap_or_default()),
            key: DisplayText::new(&entry.key),
            value: DisplayText::new(&entry.value),
            attempts: None,
            next_attempt: String::new(),
            link: None,
        }
    }

    pub fn from_queue_message(message: &QueueMessage, zone: TimestampZone) -> Self {
        let style = match message.attempts {
            0 => RowStyle::Waiting,
            1 => RowStyle::Attempted,
            _ => RowStyle::Retrying,
        };

        Self {
            style,
            timestamp: zone.format(message.message_timestamp),
            kind: DisplayText::default(),
            queue: DisplayText::default(),
            key: DisplayText::new(&message.message_stream),
            value: DisplayText::new(&message.message_payload),
            attempts: Some(message.attempts),
            next_attempt: zone.format(message.next_attempt),
            link: RowLink::query(TASK_LOG_TOPIC, &message.message_stream),
        }
    }

    pub fn from_queue_summary(summary: &QueueSummary) -> Self {
        let style = if summary.size > QUEUE_BACKLOG_WARN {
            RowStyle::Retrying
        } else if summary.size > 0 {
            RowStyle::Attempted
        } else {
            RowStyle::Waiting
        };

        Self {
            style,
            timestamp: String::new(),
            kind: DisplayText::default(),
            queue: DisplayText::default(),
            key: DisplayText::new(&summary.name),
            value: DisplayText::new(&summary.size.to_string()),
            attempts: None,
            next_attempt: String::new(),
            link: (!summary.name.is_empty()).then(|| RowLink::Queue(summary.name.clone())),
        }
    }

    pub fn with_link(mut self, link: Option<RowLink>) -> Self {
        self.link = link;
        self
    }

    pub fn from_key_count(key: &str, count: &Value) -> Self {
        let count = match count {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };

        Self {
            style: RowStyle::Plain,
            timestamp: String::new(),
            kind: DisplayText::default(),
            queue: DisplayText::default(),
            key: DisplayText::new(key),
            value: DisplayText::new(&count),
            attempts: None,
            next_attempt: String::new(),
            link: None,
        }
    }
}

/// Single-pass HTML escaping; `&` is never produced by an earlier replacement.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn terminal_safe(raw: &str) -> String {
    raw.trim_end_matches(['\n', '\r'])
        .chars()
        .map(|ch| if ch.is_control() { ' ' } else { ch })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_handles_ampersand_before_angle() {
        assert_eq!(escape_html("a < b & c"), "a &lt; b &amp; c");
        assert_eq!(escape_html("&lt;"), "&amp;lt;");
        assert_eq!(escape_html("\"q\" 'x'"), "&quot;q&quot; &#39;x&#39;");
    }

    #[test]
    fn utc_timestamps_have_millisecond_precision() {
        assert_eq!(TimestampZone::Utc.format(1000.0), "1970-01-01 00:16:40.000");
        assert_eq!(TimestampZone::Utc.format(1_700_000_000.25), "2023-11-14 22:13:20.250");
        assert_eq!(TimestampZone::Utc.format(f64::NAN), "");
    }

    #[test]
    fn entry_rows_escape_every_backend_field() {
        let mut entry = LogEntry::new(1000.0, "TASK_ERROR", "<k>", "x & y\n");
        entry.queue = Some("q\"1".to_string());
        let row = RenderedRow::from_entry(&entry, TimestampZone::Utc);

        assert_eq!(row.style, RowStyle::Error);
        assert_eq!(row.key.html(), "&lt;k&gt;");
        assert_eq!(row.value.html(), "x &amp; y\n");
        assert_eq!(row.value.plain(), "x & y");
        assert_eq!(row.queue.html(), "q&quot;1");
        assert_eq!(row.kind.plain(), "TASK_ERROR");
    }

    #[test]
    fn entry_styles_follow_kind() {
        let style = |kind: &str| {
            RenderedRow::from_entry(&LogEntry::new(0.0, kind, "k", "v"), TimestampZone::Utc).style
        };
        assert_eq!(style("TASK_OUTPUT"), RowStyle::Output);
        assert_eq!(style("TASK_BEGIN"), RowStyle::Lifecycle);
        assert_eq!(style("TASK_COMPLETE"), RowStyle::Lifecycle);
        assert_eq!(style("MSG_CANCELED"), RowStyle::Plain);
        assert_eq!(RowStyle::Plain.css_class(), None);
    }

    #[test]
    fn queue_rows_are_styled_by_attempts_and_size() {
        let message = QueueMessage {
            message_stream: "task-1".to_string(),
            message_payload: "<run>".to_string(),
            message_timestamp: 0.0,
            attempts: 3,
            next_attempt: 60.0,
        };
        let row = RenderedRow::from_queue_message(&message, TimestampZone::Utc);
        assert_eq!(row.style, RowStyle::Retrying);
        assert_eq!(row.value.html(), "&lt;run&gt;");
        assert_eq!(row.next_attempt, "1970-01-01 00:01:00.000");

        let busy = QueueSummary {
            name: "q".to_string(),
            size: 5000,
        };
        assert_eq!(RenderedRow::from_queue_summary(&busy).style, RowStyle::Retrying);
        let idle = QueueSummary {
            name: "q".to_string(),
            size: 0,
        };
        assert_eq!(RenderedRow::from_queue_summary(&idle).style, RowStyle::Waiting);
    }

    #[test]
    fn links_point_at_the_matching_dashboard_page() {
        let task = RowLink::query(TASK_LOG_TOPIC, "task 1&2").expect("link");
        assert_eq!(task.href(), "task_query.html?key=task+1%262");
        let event = RowLink::query(EVENT_LOG_TOPIC, "e1").expect("link");
        assert_eq!(event.href(), "event_query.html?key=e1");
        let other = RowLink::query("builds", "b7").expect("link");
        assert_eq!(other.href(), "query.html?topic=builds&key=b7");
        assert_eq!(RowLink::Queue("tasks:queue".to_string()).href(), "queue.html?queue=tasks%3Aqueue");
        assert_eq!(RowLink::query(TASK_LOG_TOPIC, ""), None);

        assert_eq!(
            task.query_request(),
            Some(QueryRequest::Single(QueryClause::new(
                "tasks.ID:index",
                tailboard_adapter::QueryOp::Eq,
                "task 1&2"
            )))
        );
        assert_eq!(RowLink::Queue("q".to_string()).query_request(), None);
    }

    #[test]
    fn queue_rows_link_to_their_drill_down() {
        let message = QueueMessage {
            message_stream: "task-9".to_string(),
            ..QueueMessage::default()
        };
        assert_eq!(
            RenderedRow::from_queue_message(&message, TimestampZone::Utc).link,
            RowLink::query(TASK_LOG_TOPIC, "task-9")
        );
        let summary = QueueSummary {
            name: "mail".to_string(),
            size: 2,
        };
        assert_eq!(
            RenderedRow::from_queue_summary(&summary).link,
            Some(RowLink::Queue("mail".to_string()))
        );
    }

    #[test]
    fn control_characters_never_reach_the_terminal() {
        let row = RenderedRow::from_entry(
            &LogEntry::line("\u{1b}[31mred\tline\r\n"),
            TimestampZone::Utc,
        );
        assert_eq!(row.value.plain(), " [31mred line");
        assert!(row.timestamp.is_empty());
    }
}
