/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust request structs with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use serde::{Deserialize, Serialize};

use super::enums::QueryOp;

/// One `{field, op, key}` condition sent to `query.cgi`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryClause {
    pub field: String,
    pub op: QueryOp,
    pub key: String,
}

impl QueryClause {
    pub fn new(field: impl Into<String>, op: QueryOp, key: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op,
            key: key.into(),
        }
    }

    /// Field name of a topic index, e.g. `tasks.ID:index`.
    pub fn index_field(topic: &str, index: &str) -> String {
        format!("{topic}.{index}:index")
    }

    /// Exact lookup when a key is given, key listing otherwise.
    pub fn lookup(field: impl Into<String>, key: &str) -> Self {
        if key.is_empty() {
            Self::new(field, QueryOp::Keys, "")
        } else {
            Self::new(field, QueryOp::Eq, key)
        }
    }
}

/// Body of a `query.cgi` POST: a single clause or a list of clauses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryRequest {
    Single(QueryClause),
    Compound(Vec<QueryClause>),
}

impl QueryRequest {
    pub fn from_clauses(mut clauses: Vec<QueryClause>) -> Option<Self> {
        match clauses.len() {
            0 => None,
            1 => clauses.pop().map(QueryRequest::Single),
            _ => Some(QueryRequest::Compound(clauses)),
        }
    }

    /// Operator of the leading clause; `keys` is only valid on single queries.
    pub fn op(&self) -> QueryOp {
        match self {
            QueryRequest::Single(clause) => clause.op,
            QueryRequest::Compound(clauses) => {
                clauses.first().map(|clause| clause.op).unwrap_or(QueryOp::Eq)
            }
        }
    }
}
