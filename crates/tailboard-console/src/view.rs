/*
[INPUT]:  TailTarget, ViewSettings, LogSource per stream, render surfaces, commands
[OUTPUT]: Running tail view actor plus a ViewHandle to control it
[POS]:    View controller - owns pollers, log buffer, and renderer of one view
[UPDATE]: When adding view targets, commands, or lifecycle transitions
*/

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use tailboard_adapter::{Offset, TailClient};

use crate::log_buffer::LogBuffer;
use crate::poller::{PollEvent, PollState, Poller, PollerConfig, next_event_any};
use crate::render::{FrameReceiver, RenderSurface, Renderer, TableLayout, ViewStatus};
use crate::row::TimestampZone;
use crate::source::{Cursor, LogSource, StreamPath, TailSource};

pub const EVENT_LOG_TOPIC: &str = "event_log";
pub const TASK_LOG_TOPIC: &str = "tasks";
pub const DEFAULT_RENDER_INTERVAL: Duration = Duration::from_millis(33);
const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// What a tail view reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailTarget {
    Tail {
        topic: String,
        offset: Offset,
        double_encode: bool,
    },
    /// One poller per partition, all feeding the same buffer.
    Topic {
        topic: String,
        partitions: Vec<u32>,
        offset: Offset,
    },
    Events,
    Tasks,
}

impl TailTarget {
    pub fn title(&self) -> String {
        match self {
            TailTarget::Tail { topic, .. } => format!("tail {topic}"),
            TailTarget::Topic {
                topic, partitions, ..
            } => {
                let list: Vec<String> = partitions.iter().map(u32::to_string).collect();
                format!("topic {topic} [{}]", list.join(","))
            }
            TailTarget::Events => "event log".to_string(),
            TailTarget::Tasks => "task log".to_string(),
        }
    }

    pub fn layout(&self) -> TableLayout {
        match self {
            TailTarget::Tail { .. } | TailTarget::Topic { .. } => TableLayout::Lines,
            TailTarget::Events => TableLayout::Events,
            TailTarget::Tasks => TableLayout::Tasks,
        }
    }

    pub fn streams(&self) -> Vec<StreamPath> {
        match self {
            TailTarget::Tail {
                topic,
                double_encode,
                ..
            } => vec![StreamPath::Tail {
                topic: topic.clone(),
                double_encode: *double_encode,
            }],
            TailTarget::Topic {
                topic, partitions, ..
            } => partitions
                .iter()
                .map(|partition| StreamPath::Topic {
                    topic: topic.clone(),
                    partition: *partition,
                })
                .collect(),
            TailTarget::Events => vec![StreamPath::Tail {
                topic: EVENT_LOG_TOPIC.to_string(),
                double_encode: false,
            }],
            TailTarget::Tasks => vec![StreamPath::Tail {
                topic: TASK_LOG_TOPIC.to_string(),
                double_encode: false,
            }],
        }
    }

    /// Offset polling starts from. With output hidden the task log starts at `recent`.
    pub fn origin(&self, show_output: bool) -> Offset {
        match self {
            TailTarget::Tail { offset, .. } | TailTarget::Topic { offset, .. } => *offset,
            TailTarget::Events => Offset::Last,
            TailTarget::Tasks if show_output => Offset::Last,
            TailTarget::Tasks => Offset::Recent,
        }
    }

    pub fn has_output_filter(&self) -> bool {
        matches!(self, TailTarget::Events | TailTarget::Tasks)
    }

    /// Query topic whose lookup page each row key opens.
    pub fn link_topic(&self) -> Option<&'static str> {
        match self {
            TailTarget::Events => Some(EVENT_LOG_TOPIC),
            TailTarget::Tasks => Some(TASK_LOG_TOPIC),
            TailTarget::Tail { .. } | TailTarget::Topic { .. } => None,
        }
    }

    pub fn default_count(&self) -> u32 {
        match self {
            TailTarget::Tasks => 1000,
            _ => 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewSettings {
    /// Page size per request and buffer capacity.
    pub count: u32,
    pub render_interval: Duration,
    pub poller: PollerConfig,
    pub zone: TimestampZone,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            count: 100,
            render_interval: DEFAULT_RENDER_INTERVAL,
            poller: PollerConfig::default(),
            zone: TimestampZone::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewCommand {
    Pause,
    Resume,
    TogglePause,
    ToggleOutput,
}

/// A view actor runnable by [`spawn_view`].
#[async_trait]
pub trait ViewActor: Send + 'static {
    async fn run(self, commands: mpsc::Receiver<ViewCommand>, shutdown: CancellationToken);
}

pub struct ViewHandle {
    commands: mpsc::Sender<ViewCommand>,
    frames: FrameReceiver,
    shutdown: CancellationToken,
    join: JoinHandle<()>,
}

impl ViewHandle {
    pub fn commands(&self) -> mpsc::Sender<ViewCommand> {
        self.commands.clone()
    }

    pub fn frames(&self) -> FrameReceiver {
        self.frames.clone()
    }

    pub async fn send(&self, command: ViewCommand) -> anyhow::Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow::anyhow!("view stopped"))
    }

    /// Cancel the view and wait for it to finish.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.shutdown.cancel();
        self.join.await?;
        Ok(())
    }
}

/// Spawn `view` on the runtime. `frames` should be the receiver of the view's watch surface.
pub fn spawn_view<V: ViewActor>(view: V, frames: FrameReceiver, shutdown: CancellationToken) -> ViewHandle {
    let (commands, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let token = shutdown.clone();
    let join = tokio::spawn(async move { view.run(rx, token).await });
    ViewHandle {
        commands,
        frames,
        shutdown,
        join,
    }
}

/// Tail view: one buffer fed by one poller per stream.
pub struct TailView<S: LogSource> {
    target: TailTarget,
    settings: ViewSettings,
    pollers: Vec<Poller<S>>,
    buffer: LogBuffer,
    renderer: Renderer,
    state: PollState,
    last_error: Option<String>,
}

impl TailView<TailSource> {
    pub fn connect(
        target: TailTarget,
        settings: ViewSettings,
        client: Arc<TailClient>,
        surfaces: Vec<Box<dyn RenderSurface>>,
    ) -> Self {
        let sources = target
            .streams()
            .into_iter()
            .map(|stream| Arc::new(TailSource::new(Arc::clone(&client), stream)))
            .collect();
        Self::with_sources(target, settings, sources, surfaces)
    }
}

impl<S: LogSource> TailView<S> {
    pub fn with_sources(
        target: TailTarget,
        settings: ViewSettings,
        sources: Vec<Arc<S>>,
        surfaces: Vec<Box<dyn RenderSurface>>,
    ) -> Self {
        let origin = Cursor::position(target.origin(true), settings.count);
        let pollers = sources
            .into_iter()
            .map(|source| Poller::new(source, origin.clone(), settings.poller))
            .collect();
        let renderer = Renderer::new(target.title(), target.layout(), surfaces);
        let mut buffer = LogBuffer::new(settings.count as usize, settings.zone);
        if let Some(topic) = target.link_topic() {
            buffer = buffer.link_keys_to(topic);
        }
        Self {
            buffer,
            target,
            settings,
            pollers,
            renderer,
            state: PollState::Paused,
            last_error: None,
        }
    }

    /// Start with output entries shown or hidden. Ignored for targets without the filter.
    pub fn with_output(mut self, show: bool) -> Self {
        if self.target.has_output_filter() {
            self.buffer.set_show_output(show);
            self.buffer.take_dirty();
        }
        self
    }

    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    fn origin_cursor(&self) -> Cursor {
        Cursor::position(
            self.target.origin(self.buffer.show_output()),
            self.settings.count,
        )
    }

    pub fn start(&mut self) {
        let origin = self.origin_cursor();
        for poller in &mut self.pollers {
            poller.start(origin.clone());
        }
        self.state = PollState::Running;
        info!(view = %self.target.title(), streams = self.pollers.len(), "view started");
    }

    /// Stop polling; buffered rows stay and the paused status is rendered once.
    pub fn pause(&mut self) {
        if self.state == PollState::Paused {
            return;
        }
        for poller in &mut self.pollers {
            poller.stop();
        }
        self.state = PollState::Paused;
        info!(view = %self.target.title(), "view paused");
        self.refresh();
    }

    pub fn resume(&mut self) {
        if self.state == PollState::Running {
            return;
        }
        for poller in &mut self.pollers {
            poller.resume();
        }
        self.state = PollState::Running;
        info!(view = %self.target.title(), "view resumed");
        self.refresh();
    }

    /// Flip the output filter, clear the buffer, and refetch from the origin.
    pub fn toggle_output(&mut self) {
        if !self.target.has_output_filter() {
            debug!(view = %self.target.title(), "output toggle ignored");
            return;
        }
        let show = !self.buffer.show_output();
        self.buffer.set_show_output(show);
        let origin = self.origin_cursor();
        for poller in &mut self.pollers {
            poller.restart(origin.clone());
        }
        info!(view = %self.target.title(), show_output = show, "output filter toggled");
        self.refresh();
    }

    pub fn apply(&mut self, command: ViewCommand) {
        match command {
            ViewCommand::Pause => self.pause(),
            ViewCommand::Resume => self.resume(),
            ViewCommand::TogglePause => match self.state {
                PollState::Running => self.pause(),
                PollState::Paused => self.resume(),
            },
            ViewCommand::ToggleOutput => self.toggle_output(),
        }
    }

    /// Apply one poll outcome. Failures leave the buffer and its dirty flag untouched.
    pub fn apply_event(&mut self, event: PollEvent) {
        match event {
            PollEvent::Batch(batch) => {
                self.buffer.push(&batch.entries);
                self.last_error = None;
            }
            PollEvent::Failed { error, .. } => {
                self.last_error = Some(error.to_string());
            }
        }
    }

    pub fn status(&self) -> ViewStatus {
        let mut status = ViewStatus::new(self.state, self.buffer.len(), self.buffer.capacity());
        if self.target.has_output_filter() {
            status.show_output = Some(self.buffer.show_output());
        }
        status.cursor = self
            .pollers
            .iter()
            .map(|poller| poller.cursor().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        status.last_error = self.last_error.clone();
        status
    }

    /// Render when the buffer is dirty.
    pub fn render_tick(&mut self) -> bool {
        let status = self.status();
        self.renderer.tick(&mut self.buffer, status, None)
    }

    fn refresh(&mut self) {
        let status = self.status();
        self.renderer.refresh(&mut self.buffer, status, None);
    }
}

#[async_trait]
impl<S: LogSource> ViewActor for TailView<S> {
    async fn run(mut self, mut commands: mpsc::Receiver<ViewCommand>, shutdown: CancellationToken) {
        let mut render = tokio::time::interval(self.settings.render_interval);
        render.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut commands_open = true;

        self.start();
        self.refresh();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(view = %self.target.title(), "view shutdown requested");
                    break;
                }
                command = commands.recv(), if commands_open => match command {
                    Some(command) => self.apply(command),
                    None => commands_open = false,
                },
                _ = render.tick(), if self.state == PollState::Running => {
                    self.render_tick();
                }
                (_, event) = next_event_any(&mut self.pollers) => {
                    self.apply_event(event);
                }
            }
        }

        for poller in &mut self.pollers {
            poller.stop();
        }
        self.state = PollState::Paused;
        self.renderer.close().await;
    }
}
