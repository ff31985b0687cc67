/*
[INPUT]:  TailClient and a stream description (tail.cgi topic or topic.cgi partition)
[OUTPUT]: Cursor type and the LogSource seam pollers fetch through
[POS]:    Boundary between poll scheduling and the HTTP adapter
[UPDATE]: When adding stream kinds or cursor forms
*/

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use tailboard_adapter::{Envelope, Offset, TailClient, TailboardError, tail_path, topic_path};

/// Position in a backend stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// Derived from an offset and a page size.
    Position { offset: Offset, count: u32 },
    /// Continuation URL supplied by the server.
    Next(String),
}

impl Cursor {
    pub fn position(offset: Offset, count: u32) -> Self {
        Cursor::Position { offset, count }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cursor::Position { offset, count } => write!(f, "{offset}/{count}"),
            Cursor::Next(url) => f.write_str(url),
        }
    }
}

#[async_trait]
pub trait LogSource: Send + Sync + 'static {
    /// Request path for a cursor.
    fn locate(&self, cursor: &Cursor) -> String;

    /// Whether a server `next_url` points at the position just requested.
    fn is_same_position(&self, requested: &str, next_url: &str) -> bool {
        requested == next_url
    }

    async fn fetch(&self, cursor: &Cursor) -> Result<Envelope, TailboardError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamPath {
    Tail { topic: String, double_encode: bool },
    Topic { topic: String, partition: u32 },
}

impl StreamPath {
    pub fn path(&self, offset: Offset, count: u32) -> String {
        match self {
            StreamPath::Tail {
                topic,
                double_encode,
            } => tail_path(topic, offset, count, *double_encode),
            StreamPath::Topic { topic, partition } => topic_path(topic, *partition, offset, count),
        }
    }
}

/// LogSource over the tail.cgi / topic.cgi endpoints.
#[derive(Debug, Clone)]
pub struct TailSource {
    client: Arc<TailClient>,
    stream: StreamPath,
}

impl TailSource {
    pub fn new(client: Arc<TailClient>, stream: StreamPath) -> Self {
        Self { client, stream }
    }
}

#[async_trait]
impl LogSource for TailSource {
    fn locate(&self, cursor: &Cursor) -> String {
        match cursor {
            Cursor::Position { offset, count } => self.stream.path(*offset, *count),
            Cursor::Next(url) => url.clone(),
        }
    }

    fn is_same_position(&self, requested: &str, next_url: &str) -> bool {
        if requested == next_url {
            return true;
        }
        match (self.client.resolve(requested), self.client.resolve(next_url)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    async fn fetch(&self, cursor: &Cursor) -> Result<Envelope, TailboardError> {
        self.client.fetch_envelope(&self.locate(cursor)).await
    }
}
