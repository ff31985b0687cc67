/*
[INPUT]:  Backend label strings and stream position segments
[OUTPUT]: Typed Rust enums with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When the entry type vocabulary or query operators change
*/

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Entry `type` as reported by the log service.
///
/// Labels are classified by their last `_`-separated word, so `TASK_ERROR`,
/// `EVENT_ERROR` and `ERROR` all map to [`EntryKind::Error`]. The original label
/// is kept for display.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntryKind {
    Begin(String),
    Complete(String),
    Error(String),
    Output(String),
    Canceled(String),
    Other(String),
    #[default]
    Unspecified,
}

impl EntryKind {
    pub fn label(&self) -> &str {
        match self {
            EntryKind::Begin(label)
            | EntryKind::Complete(label)
            | EntryKind::Error(label)
            | EntryKind::Output(label)
            | EntryKind::Canceled(label)
            | EntryKind::Other(label) => label,
            EntryKind::Unspecified => "",
        }
    }

    /// Verbose entries that views may hide.
    pub fn is_output(&self) -> bool {
        matches!(self, EntryKind::Output(_))
    }

    pub fn is_lifecycle(&self) -> bool {
        matches!(self, EntryKind::Begin(_) | EntryKind::Complete(_))
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, EntryKind::Canceled(_))
    }
}

impl From<String> for EntryKind {
    fn from(label: String) -> Self {
        if label.is_empty() {
            return EntryKind::Unspecified;
        }
        let word = label.rsplit('_').next().unwrap_or_default();
        match word.to_ascii_uppercase().as_str() {
            "BEGIN" => EntryKind::Begin(label),
            "COMPLETE" => EntryKind::Complete(label),
            "ERROR" => EntryKind::Error(label),
            "OUTPUT" => EntryKind::Output(label),
            "CANCELED" | "CANCELLED" => EntryKind::Canceled(label),
            _ => EntryKind::Other(label),
        }
    }
}

impl From<&str> for EntryKind {
    fn from(label: &str) -> Self {
        EntryKind::from(label.to_string())
    }
}

impl From<EntryKind> for String {
    fn from(kind: EntryKind) -> Self {
        kind.label().to_string()
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Query operator accepted by `query.cgi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryOp {
    Keys,
    Eq,
    Ne,
    Re,
    Nr,
    Ge,
    Le,
}

impl QueryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryOp::Keys => "keys",
            QueryOp::Eq => "eq",
            QueryOp::Ne => "ne",
            QueryOp::Re => "re",
            QueryOp::Nr => "nr",
            QueryOp::Ge => "ge",
            QueryOp::Le => "le",
        }
    }
}

impl FromStr for QueryOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keys" => Ok(QueryOp::Keys),
            "eq" => Ok(QueryOp::Eq),
            "ne" => Ok(QueryOp::Ne),
            "re" => Ok(QueryOp::Re),
            "nr" => Ok(QueryOp::Nr),
            "ge" => Ok(QueryOp::Ge),
            "le" => Ok(QueryOp::Le),
            other => Err(format!("unknown query operator: {other}")),
        }
    }
}

impl fmt::Display for QueryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Starting position inside a tailed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Offset {
    At(u64),
    Last,
    Recent,
}

impl FromStr for Offset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "last" => Ok(Offset::Last),
            "recent" => Ok(Offset::Recent),
            other => other
                .parse::<u64>()
                .map(Offset::At)
                .map_err(|_| format!("offset must be a number, 'last' or 'recent': {other}")),
        }
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Offset::At(offset) => write!(f, "{offset}"),
            Offset::Last => f.write_str("last"),
            Offset::Recent => f.write_str("recent"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("TASK_BEGIN", EntryKind::Begin("TASK_BEGIN".to_string()))]
    #[case("TASK_COMPLETE", EntryKind::Complete("TASK_COMPLETE".to_string()))]
    #[case("TASK_ERROR", EntryKind::Error("TASK_ERROR".to_string()))]
    #[case("TASK_OUTPUT", EntryKind::Output("TASK_OUTPUT".to_string()))]
    #[case("MSG_CANCELED", EntryKind::Canceled("MSG_CANCELED".to_string()))]
    #[case("ERROR", EntryKind::Error("ERROR".to_string()))]
    #[case("TASK_QUEUED", EntryKind::Other("TASK_QUEUED".to_string()))]
    #[case("", EntryKind::Unspecified)]
    fn entry_kind_classifies_labels(#[case] label: &str, #[case] expected: EntryKind) {
        assert_eq!(EntryKind::from(label), expected);
    }

    #[test]
    fn entry_kind_keeps_label_through_serde() {
        let kind: EntryKind = serde_json::from_str("\"TASK_OUTPUT\"").expect("kind");
        assert!(kind.is_output());
        assert_eq!(serde_json::to_string(&kind).expect("json"), "\"TASK_OUTPUT\"");
    }

    #[test]
    fn query_op_roundtrips_wire_names() {
        assert_eq!(serde_json::to_string(&QueryOp::Nr).expect("json"), "\"nr\"");
        assert_eq!("ge".parse::<QueryOp>(), Ok(QueryOp::Ge));
        assert!("gt".parse::<QueryOp>().is_err());
    }

    #[test]
    fn offset_parses_path_segments() {
        assert_eq!("last".parse::<Offset>(), Ok(Offset::Last));
        assert_eq!("recent".parse::<Offset>(), Ok(Offset::Recent));
        assert_eq!("42".parse::<Offset>(), Ok(Offset::At(42)));
        assert!("start".parse::<Offset>().is_err());
        assert_eq!(Offset::At(7).to_string(), "7");
    }
}
