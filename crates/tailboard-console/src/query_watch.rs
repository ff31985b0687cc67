/*
[INPUT]:  TailClient, topic name, QueryRequest, idle delay
[OUTPUT]: Polling query view rendering key listings or matching entries
[POS]:    View controller for query.cgi lookups
[UPDATE]: When changing query rescheduling, sorting, or stop conditions
*/

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tailboard_adapter::{LogEntry, QueryOp, QueryRequest, QueryResponse, TailClient, TailboardError};

use crate::log_buffer::LogBuffer;
use crate::poller::{DEFAULT_IDLE_DELAY, PollState, RequestSlot};
use crate::render::{RenderSurface, Renderer, TableLayout, ViewStatus};
use crate::row::{RenderedRow, RowLink, TimestampZone};
use crate::view::{ViewActor, ViewCommand};

pub const MAX_QUERY_ROWS: usize = 10_000;
pub const NO_RESULTS: &str = "no results";

type QueryResult = Result<QueryResponse, TailboardError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuerySettings {
    pub idle_delay: Duration,
    pub capacity: usize,
    pub zone: TimestampZone,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            idle_delay: DEFAULT_IDLE_DELAY,
            capacity: MAX_QUERY_ROWS,
            zone: TimestampZone::default(),
        }
    }
}

/// Outcome of applying one query response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryProgress {
    /// Issue the query again after the idle delay.
    Continue,
    /// Stop polling: a key listing completed or the task was canceled.
    Finished,
}

pub struct QueryWatch {
    client: Arc<TailClient>,
    topic: String,
    request: QueryRequest,
    settings: QuerySettings,
    buffer: LogBuffer,
    renderer: Renderer,
    slot: RequestSlot<QueryResult>,
    state: PollState,
    finished: bool,
    notice: Option<String>,
    last_error: Option<String>,
}

impl QueryWatch {
    pub fn new(
        client: Arc<TailClient>,
        topic: impl Into<String>,
        request: QueryRequest,
        settings: QuerySettings,
        surfaces: Vec<Box<dyn RenderSurface>>,
    ) -> Self {
        let topic = topic.into();
        let layout = if request.op() == QueryOp::Keys {
            TableLayout::Keys
        } else {
            TableLayout::Tasks
        };
        let renderer = Renderer::new(format!("query {topic} ({})", request.op()), layout, surfaces);
        Self {
            client,
            topic,
            request,
            buffer: LogBuffer::new(settings.capacity, settings.zone),
            settings,
            renderer,
            slot: RequestSlot::default(),
            state: PollState::Paused,
            finished: false,
            notice: None,
            last_error: None,
        }
    }

    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    fn schedule(&mut self, delay: Duration) {
        let client = Arc::clone(&self.client);
        let topic = self.topic.clone();
        let request = self.request.clone();
        self.slot
            .schedule(delay, async move { client.query(&topic, &request).await });
    }

    /// Apply a response and decide whether to keep polling.
    pub fn apply_response(&mut self, response: QueryResponse) -> QueryProgress {
        self.last_error = None;
        match response {
            QueryResponse::Empty => {
                self.buffer.clear();
                self.notice = Some(NO_RESULTS.to_string());
                QueryProgress::Continue
            }
            QueryResponse::Error(message) => {
                warn!(topic = %self.topic, error = %message, "query returned an error");
                self.buffer.clear();
                self.notice = Some(message);
                QueryProgress::Continue
            }
            QueryResponse::Keys(keys) => {
                self.notice = if keys.is_empty() {
                    Some(NO_RESULTS.to_string())
                } else {
                    None
                };
                let topic = self.topic.as_str();
                self.buffer.replace(keys.iter().map(|(key, count)| {
                    RenderedRow::from_key_count(key, count).with_link(RowLink::query(topic, key))
                }));
                QueryProgress::Finished
            }
            QueryResponse::Matches(matches) => {
                let mut entries: Vec<LogEntry> =
                    matches.into_iter().map(|m| m.into_entry()).collect();
                entries.sort_by(|a, b| {
                    let a = a.timestamp.unwrap_or(0.0);
                    let b = b.timestamp.unwrap_or(0.0);
                    a.total_cmp(&b)
                });
                let canceled = entries.iter().any(|entry| entry.kind.is_canceled());
                let skip = entries.len().saturating_sub(self.settings.capacity);
                let zone = self.buffer.zone();
                let topic = self.topic.as_str();
                self.buffer.replace(entries[skip..].iter().map(|entry| {
                    RenderedRow::from_entry(entry, zone)
                        .with_link(RowLink::query(topic, &entry.key))
                }));
                self.notice = None;
                if canceled {
                    info!(topic = %self.topic, "canceled entry seen, query polling stops");
                    QueryProgress::Finished
                } else {
                    QueryProgress::Continue
                }
            }
        }
    }

    fn on_result(&mut self, result: QueryResult) {
        match result {
            Ok(response) => {
                if self.apply_response(response) == QueryProgress::Finished {
                    self.finished = true;
                    self.state = PollState::Paused;
                } else {
                    self.schedule(self.settings.idle_delay);
                }
            }
            Err(error) => {
                warn!(topic = %self.topic, error = %error, "query failed");
                self.last_error = Some(error.to_string());
                self.schedule(self.settings.idle_delay);
            }
        }
        self.refresh();
    }

    pub fn status(&self) -> ViewStatus {
        let mut status = ViewStatus::new(self.state, self.buffer.len(), self.buffer.capacity());
        status.last_error = self.last_error.clone();
        status
    }

    fn refresh(&mut self) {
        let status = self.status();
        self.renderer
            .refresh(&mut self.buffer, status, self.notice.clone());
    }

    fn apply(&mut self, command: ViewCommand) {
        let pause = match command {
            ViewCommand::Pause => true,
            ViewCommand::Resume => false,
            ViewCommand::TogglePause => self.state == PollState::Running,
            ViewCommand::ToggleOutput => {
                debug!(topic = %self.topic, "output toggle ignored");
                return;
            }
        };
        if pause && self.state == PollState::Running {
            self.slot.cancel();
            self.state = PollState::Paused;
        } else if !pause && self.state == PollState::Paused && !self.finished {
            self.state = PollState::Running;
            self.schedule(Duration::ZERO);
        } else {
            return;
        }
        self.refresh();
    }
}

#[async_trait]
impl ViewActor for QueryWatch {
    async fn run(mut self, mut commands: mpsc::Receiver<ViewCommand>, shutdown: CancellationToken) {
        let mut commands_open = true;
        self.state = PollState::Running;
        self.schedule(Duration::ZERO);
        info!(topic = %self.topic, op = %self.request.op(), "query watch started");
        self.refresh();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                command = commands.recv(), if commands_open => match command {
                    Some(command) => self.apply(command),
                    None => commands_open = false,
                },
                result = self.slot.ready() => self.on_result(result),
            }
        }
        self.slot.cancel();
        self.renderer.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tailboard_adapter::{QueryClause, QueryMatch};

    fn watch(request: QueryRequest) -> QueryWatch {
        let client = TailClient::new("http://127.0.0.1:9/").expect("client");
        let settings = QuerySettings {
            zone: TimestampZone::Utc,
            ..QuerySettings::default()
        };
        QueryWatch::new(Arc::new(client), "tasks", request, settings, Vec::new())
    }

    fn lookup() -> QueryRequest {
        QueryRequest::Single(QueryClause::lookup("tasks.ID:index", "task-1"))
    }

    fn matched(timestamp: f64, kind: &str, value: &str) -> QueryMatch {
        serde_json::from_value(serde_json::json!({
            "value": {"timestamp": timestamp, "type": kind, "key": "task-1", "value": value}
        }))
        .expect("match")
    }

    fn values(watch: &QueryWatch) -> Vec<String> {
        watch
            .buffer()
            .snapshot()
            .iter()
            .map(|row| row.value.plain().to_string())
            .collect()
    }

    #[test]
    fn matches_are_sorted_oldest_first() {
        let mut watch = watch(lookup());
        let progress = watch.apply_response(QueryResponse::Matches(vec![
            matched(3.0, "TASK_OUTPUT", "third"),
            matched(1.0, "TASK_BEGIN", "first"),
            matched(2.0, "TASK_OUTPUT", "second"),
        ]));
        assert_eq!(progress, QueryProgress::Continue);
        assert_eq!(values(&watch), vec!["first", "second", "third"]);
    }

    #[test]
    fn canceled_entry_finishes_the_query() {
        let mut watch = watch(lookup());
        let progress = watch.apply_response(QueryResponse::Matches(vec![
            matched(1.0, "TASK_BEGIN", "go"),
            matched(2.0, "MSG_CANCELED", "stop"),
        ]));
        assert_eq!(progress, QueryProgress::Finished);
    }

    #[test]
    fn error_payload_is_shown_and_polling_continues() {
        let mut watch = watch(lookup());
        watch.apply_response(QueryResponse::Matches(vec![matched(1.0, "TASK_BEGIN", "go")]));
        let progress = watch.apply_response(QueryResponse::Error("bad <regex>".to_string()));
        assert_eq!(progress, QueryProgress::Continue);
        assert_eq!(watch.notice(), Some("bad <regex>"));
        assert!(watch.buffer().is_empty());
    }

    #[test]
    fn empty_result_reads_no_results() {
        let mut watch = watch(lookup());
        assert_eq!(watch.apply_response(QueryResponse::Empty), QueryProgress::Continue);
        assert_eq!(watch.notice(), Some(NO_RESULTS));
    }

    #[test]
    fn key_listing_runs_once() {
        let mut watch = watch(QueryRequest::Single(QueryClause::lookup("tasks.ID:index", "")));
        let keys = [("a".to_string(), serde_json::json!(2)), ("b".to_string(), serde_json::json!(7))]
            .into_iter()
            .collect();
        assert_eq!(watch.apply_response(QueryResponse::Keys(keys)), QueryProgress::Finished);
        assert_eq!(values(&watch), vec!["2", "7"]);
    }
}
