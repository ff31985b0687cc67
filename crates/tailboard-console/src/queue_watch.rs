/*
[INPUT]:  TailClient, optional queue name, poll interval
[OUTPUT]: Periodic full-replace rendering of queue contents or queue depths
[POS]:    View controller for the /fetch queue endpoints
[UPDATE]: When changing queue polling cadence, row caps, or styling
*/

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tailboard_adapter::{QueueMessage, QueueSummary, TailClient, TailboardError};

use crate::log_buffer::LogBuffer;
use crate::poller::{PollState, RequestSlot};
use crate::render::{RenderSurface, Renderer, TableLayout, ViewStatus};
use crate::row::{RenderedRow, TimestampZone};
use crate::view::{ViewActor, ViewCommand};

pub const DEFAULT_QUEUE_INTERVAL: Duration = Duration::from_millis(2000);
pub const MAX_QUEUE_ROWS: usize = 1000;
pub const EMPTY_QUEUE: &str = "-empty-";
pub const NO_QUEUES: &str = "-none-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueTarget {
    /// Messages held by one queue.
    Messages(String),
    /// Every queue with its depth.
    List,
}

#[derive(Debug)]
pub enum QueueSnapshot {
    Messages(Vec<QueueMessage>),
    List(Vec<QueueSummary>),
}

type QueueResult = Result<QueueSnapshot, TailboardError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSettings {
    pub interval: Duration,
    pub capacity: usize,
    pub zone: TimestampZone,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_QUEUE_INTERVAL,
            capacity: MAX_QUEUE_ROWS,
            zone: TimestampZone::default(),
        }
    }
}

pub struct QueueWatch {
    client: Arc<TailClient>,
    target: QueueTarget,
    settings: QueueSettings,
    buffer: LogBuffer,
    renderer: Renderer,
    slot: RequestSlot<QueueResult>,
    state: PollState,
    notice: Option<String>,
    last_error: Option<String>,
}

impl QueueWatch {
    pub fn new(
        client: Arc<TailClient>,
        target: QueueTarget,
        settings: QueueSettings,
        surfaces: Vec<Box<dyn RenderSurface>>,
    ) -> Self {
        let (title, layout) = match &target {
            QueueTarget::Messages(name) => (format!("queue {name}"), TableLayout::Queue),
            QueueTarget::List => ("queues".to_string(), TableLayout::Queues),
        };
        Self {
            client,
            target,
            buffer: LogBuffer::new(settings.capacity, settings.zone),
            settings,
            renderer: Renderer::new(title, layout, surfaces),
            slot: RequestSlot::default(),
            state: PollState::Paused,
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
        let target = self.target.clone();
        self.slot.schedule(delay, async move {
            match target {
                QueueTarget::Messages(name) => {
                    client.fetch_queue(&name).await.map(QueueSnapshot::Messages)
                }
                QueueTarget::List => client.list_queues().await.map(QueueSnapshot::List),
            }
        });
    }

    /// Replace the rows with a fresh snapshot.
    pub fn apply_snapshot(&mut self, snapshot: QueueSnapshot) {
        self.last_error = None;
        let zone = self.buffer.zone();
        match snapshot {
            QueueSnapshot::Messages(messages) => {
                self.notice = messages.is_empty().then(|| EMPTY_QUEUE.to_string());
                self.buffer.replace(
                    messages
                        .iter()
                        .map(|message| RenderedRow::from_queue_message(message, zone)),
                );
            }
            QueueSnapshot::List(mut queues) => {
                queues.sort_by(|a, b| b.size.cmp(&a.size));
                self.notice = queues.is_empty().then(|| NO_QUEUES.to_string());
                self.buffer
                    .replace(queues.iter().map(RenderedRow::from_queue_summary));
            }
        }
    }

    fn on_result(&mut self, result: QueueResult) {
        match result {
            Ok(snapshot) => self.apply_snapshot(snapshot),
            Err(error) => {
                warn!(queue = ?self.target, error = %error, "queue fetch failed");
                self.last_error = Some(error.to_string());
                self.buffer.mark_dirty();
            }
        }
        self.schedule(self.settings.interval);
        let status = self.status();
        self.renderer
            .tick(&mut self.buffer, status, self.notice.clone());
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
                debug!(queue = ?self.target, "output toggle ignored");
                return;
            }
        };
        match (pause, self.state) {
            (true, PollState::Running) => {
                self.slot.cancel();
                self.state = PollState::Paused;
            }
            (false, PollState::Paused) => {
                self.state = PollState::Running;
                self.schedule(Duration::ZERO);
            }
            _ => return,
        }
        self.refresh();
    }
}

#[async_trait]
impl ViewActor for QueueWatch {
    async fn run(mut self, mut commands: mpsc::Receiver<ViewCommand>, shutdown: CancellationToken) {
        let mut commands_open = true;
        self.state = PollState::Running;
        self.schedule(Duration::ZERO);
        info!(queue = ?self.target, interval_ms = self.settings.interval.as_millis() as u64, "queue watch started");
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
    use crate::row::RowStyle;

    fn watch(target: QueueTarget) -> QueueWatch {
        let client = TailClient::new("http://127.0.0.1:9/").expect("client");
        let settings = QueueSettings {
            zone: TimestampZone::Utc,
            ..QueueSettings::default()
        };
        QueueWatch::new(Arc::new(client), target, settings, Vec::new())
    }

    fn message(stream: &str, attempts: u32) -> QueueMessage {
        QueueMessage {
            message_stream: stream.to_string(),
            message_payload: "payload".to_string(),
            message_timestamp: 0.0,
            attempts,
            next_attempt: 0.0,
        }
    }

    #[test]
    fn queue_messages_are_styled_by_attempts() {
        let mut watch = watch(QueueTarget::Messages("tasks:queue".to_string()));
        watch.apply_snapshot(QueueSnapshot::Messages(vec![
            message("a", 0),
            message("b", 1),
            message("c", 4),
        ]));
        let styles: Vec<RowStyle> = watch.buffer().snapshot().iter().map(|row| row.style).collect();
        assert_eq!(styles, vec![RowStyle::Waiting, RowStyle::Attempted, RowStyle::Retrying]);
        assert_eq!(watch.notice(), None);
    }

    #[test]
    fn queue_list_is_sorted_by_size() {
        let mut watch = watch(QueueTarget::List);
        let summary = |name: &str, size| QueueSummary {
            name: name.to_string(),
            size,
        };
        watch.apply_snapshot(QueueSnapshot::List(vec![
            summary("small", 3),
            summary("big", 4000),
            summary("idle", 0),
        ]));
        let names: Vec<String> = watch
            .buffer()
            .snapshot()
            .iter()
            .map(|row| row.key.plain().to_string())
            .collect();
        assert_eq!(names, vec!["big", "small", "idle"]);
    }

    #[test]
    fn empty_snapshots_show_markers() {
        let mut queue = watch(QueueTarget::Messages("q".to_string()));
        queue.apply_snapshot(QueueSnapshot::Messages(Vec::new()));
        assert_eq!(queue.notice(), Some(EMPTY_QUEUE));

        let mut list = watch(QueueTarget::List);
        list.apply_snapshot(QueueSnapshot::List(Vec::new()));
        assert_eq!(list.notice(), Some(NO_QUEUES));
    }

    #[test]
    fn rows_are_capped() {
        let mut watch = watch(QueueTarget::Messages("q".to_string()));
        let messages = (0..1500).map(|i| message(&i.to_string(), 0)).collect();
        watch.apply_snapshot(QueueSnapshot::Messages(messages));
        assert_eq!(watch.buffer().len(), MAX_QUEUE_ROWS);
    }
}
