/*
[INPUT]:  A LogSource, a starting Cursor, and idle/start delays
[OUTPUT]: Stream of PollEvent (batches or failures) with catch-up scheduling
[POS]:    Fetch scheduler for one stream; owned by a single view actor
[UPDATE]: When changing scheduling rules or the Running/Paused machine
*/

use std::future::{Future, poll_fn};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tracing::{debug, warn};

use tailboard_adapter::{Envelope, LogEntry, TailboardError};

use crate::source::{Cursor, LogSource};

pub const DEFAULT_IDLE_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_START_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// Delay after a caught-up response or a failure.
    pub idle_delay: Duration,
    /// Delay before the first request after `start`.
    pub start_delay: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            idle_delay: DEFAULT_IDLE_DELAY,
            start_delay: DEFAULT_START_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Running,
    Paused,
}

#[derive(Debug)]
pub struct Batch {
    pub entries: Vec<LogEntry>,
    /// Cursor after applying this response.
    pub cursor: Cursor,
    pub caught_up: bool,
    pub next_delay: Duration,
}

#[derive(Debug)]
pub enum PollEvent {
    Batch(Batch),
    Failed {
        error: TailboardError,
        retry_in: Duration,
    },
}

struct Fetched {
    requested: String,
    result: Result<Envelope, TailboardError>,
}

/// Holds at most one delayed request. The delay and the request live in one boxed
/// future, so cancelling drops both at once.
pub struct RequestSlot<T> {
    pending: Option<BoxFuture<'static, T>>,
}

impl<T> Default for RequestSlot<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T: Send + 'static> RequestSlot<T> {
    /// Replace any outstanding request with `request`, started after `delay`.
    pub fn schedule<F>(&mut self, delay: Duration, request: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        self.pending = Some(
            async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                request.await
            }
            .boxed(),
        );
    }
}

impl<T> RequestSlot<T> {
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Pending while empty; the slot empties when the request completes.
    pub fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<T> {
        let Some(pending) = self.pending.as_mut() else {
            return Poll::Pending;
        };
        let output = match pending.poll_unpin(cx) {
            Poll::Ready(output) => output,
            Poll::Pending => return Poll::Pending,
        };
        self.pending = None;
        Poll::Ready(output)
    }

    /// Wait for the outstanding request. Cancel safe; never completes while empty.
    pub async fn ready(&mut self) -> T {
        poll_fn(|cx| self.poll_ready(cx)).await
    }
}

/// Single-outstanding-request poller.
pub struct Poller<S: LogSource> {
    source: Arc<S>,
    cursor: Cursor,
    config: PollerConfig,
    state: PollState,
    slot: RequestSlot<Fetched>,
}

impl<S: LogSource> Poller<S> {
    pub fn new(source: Arc<S>, cursor: Cursor, config: PollerConfig) -> Self {
        Self {
            source,
            cursor,
            config,
            state: PollState::Paused,
            slot: RequestSlot::default(),
        }
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// True while a timer or request is outstanding.
    pub fn has_pending(&self) -> bool {
        self.slot.is_pending()
    }

    /// Begin polling from `cursor`; the first request goes out after the start delay.
    pub fn start(&mut self, cursor: Cursor) {
        self.cursor = cursor;
        self.state = PollState::Running;
        self.schedule(self.config.start_delay);
    }

    /// Cancel the timer and abort the in-flight request. Nothing is delivered afterwards.
    pub fn stop(&mut self) {
        self.state = PollState::Paused;
        self.slot.cancel();
    }

    /// Continue from the current cursor without delay.
    pub fn resume(&mut self) {
        if self.state == PollState::Running {
            return;
        }
        self.state = PollState::Running;
        self.schedule(Duration::ZERO);
    }

    /// Rewind to `cursor`. Any outstanding request is discarded; polling restarts
    /// only if the poller was running.
    pub fn restart(&mut self, cursor: Cursor) {
        self.slot.cancel();
        self.cursor = cursor;
        if self.state == PollState::Running {
            self.schedule(self.config.start_delay);
        }
    }

    /// Wait for the next event. Cancel safe: an unfinished request stays queued.
    /// Never completes while paused.
    pub async fn next_event(&mut self) -> PollEvent {
        poll_fn(|cx| self.poll_event(cx)).await
    }

    pub fn poll_event(&mut self, cx: &mut Context<'_>) -> Poll<PollEvent> {
        if self.state == PollState::Paused {
            return Poll::Pending;
        }
        match self.slot.poll_ready(cx) {
            Poll::Ready(fetched) => Poll::Ready(self.settle(fetched)),
            Poll::Pending => Poll::Pending,
        }
    }

    fn settle(&mut self, fetched: Fetched) -> PollEvent {
        let Fetched { requested, result } = fetched;
        let idle = self.config.idle_delay;

        let envelope = match result {
            Ok(envelope) => envelope,
            Err(error) => {
                warn!(
                    path = %requested,
                    retryable = error.is_retryable(),
                    error = %error,
                    retry_in_ms = idle.as_millis() as u64,
                    "poll failed"
                );
                self.schedule(idle);
                return PollEvent::Failed {
                    error,
                    retry_in: idle,
                };
            }
        };

        let advanced = envelope
            .next_url
            .as_deref()
            .filter(|next| !next.is_empty() && !self.source.is_same_position(&requested, next))
            .map(str::to_string);
        let entries = envelope.into_entries();

        let (caught_up, next_delay) = match advanced {
            Some(next) => {
                self.cursor = Cursor::Next(next);
                let delay = if entries.is_empty() { idle } else { Duration::ZERO };
                (false, delay)
            }
            None => (true, idle),
        };

        debug!(
            path = %requested,
            entries = entries.len(),
            caught_up,
            next_delay_ms = next_delay.as_millis() as u64,
            "poll batch"
        );
        self.schedule(next_delay);

        PollEvent::Batch(Batch {
            entries,
            cursor: self.cursor.clone(),
            caught_up,
            next_delay,
        })
    }

    fn schedule(&mut self, delay: Duration) {
        let source = Arc::clone(&self.source);
        let cursor = self.cursor.clone();
        self.slot.schedule(delay, async move {
            let requested = source.locate(&cursor);
            let result = source.fetch(&cursor).await;
            Fetched { requested, result }
        });
    }
}

/// Wait for the next event from any poller in `pollers`, returning its index.
/// Cancel safe, like [`Poller::next_event`].
pub async fn next_event_any<S: LogSource>(pollers: &mut [Poller<S>]) -> (usize, PollEvent) {
    poll_fn(|cx| {
        for (index, poller) in pollers.iter_mut().enumerate() {
            if let Poll::Ready(event) = poller.poll_event(cx) {
                return Poll::Ready((index, event));
            }
        }
        Poll::Pending
    })
    .await
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    pub(crate) type Scripted = Result<Envelope, TailboardError>;

    /// LogSource that replays scripted responses and records every request.
    #[derive(Default)]
    pub(crate) struct ScriptedSource {
        responses: Mutex<VecDeque<Scripted>>,
        requests: Mutex<Vec<String>>,
        latency: Mutex<Duration>,
    }

    impl ScriptedSource {
        pub(crate) fn new(responses: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
                latency: Mutex::new(Duration::ZERO),
            })
        }

        /// Hold every reply for `latency`. The reply is taken from the script when the
        /// request is sent, so a dropped request consumes it.
        pub(crate) fn set_latency(&self, latency: Duration) {
            *self.latency.lock().expect("latency") = latency;
        }

        pub(crate) fn push(&self, response: Scripted) {
            self.responses.lock().expect("responses").push_back(response);
        }

        pub(crate) fn requests(&self) -> Vec<String> {
            self.requests.lock().expect("requests").clone()
        }
    }

    #[async_trait]
    impl LogSource for ScriptedSource {
        fn locate(&self, cursor: &Cursor) -> String {
            match cursor {
                Cursor::Position { offset, count } => format!("t/{offset}/{count}"),
                Cursor::Next(url) => url.clone(),
            }
        }

        async fn fetch(&self, cursor: &Cursor) -> Result<Envelope, TailboardError> {
            self.requests.lock().expect("requests").push(self.locate(cursor));
            let reply = self
                .responses
                .lock()
                .expect("responses")
                .pop_front()
                .unwrap_or_else(|| Ok(Envelope::default()));
            let latency = *self.latency.lock().expect("latency");
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            reply
        }
    }

    pub(crate) fn envelope(keys: &[&str], next_url: Option<&str>) -> Scripted {
        let payload: Vec<_> = keys
            .iter()
            .map(|key| json!({"timestamp": 1000, "type": "TASK_BEGIN", "key": key, "value": "v1"}))
            .collect();
        Ok(serde_json::from_value(json!({"payload": payload, "next_url": next_url}))
            .expect("envelope"))
    }
}
