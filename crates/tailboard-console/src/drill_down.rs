/*
[INPUT]:  TailClient, query and queue settings, a RowLink picked from a rendered row
[OUTPUT]: A running QueryWatch or QueueWatch for the linked key or queue
[POS]:    Drill-down launcher shared by the terminal UI
[UPDATE]: When adding link kinds or views that can be opened from a row
*/

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use tailboard_adapter::TailClient;

use crate::query_watch::{QuerySettings, QueryWatch};
use crate::queue_watch::{QueueSettings, QueueTarget, QueueWatch};
use crate::render::WatchSurface;
use crate::row::{RowLink, key_lookup};
use crate::view::{ViewHandle, spawn_view};

/// Opens the view a row link points at.
#[derive(Clone)]
pub struct DrillDown {
    client: Arc<TailClient>,
    query: QuerySettings,
    queue: QueueSettings,
}

impl DrillDown {
    pub fn new(client: Arc<TailClient>, query: QuerySettings, queue: QueueSettings) -> Self {
        Self {
            client,
            query,
            queue,
        }
    }

    /// Spawn the linked view. Its frames are only published to the returned handle.
    pub fn open(&self, link: &RowLink, shutdown: CancellationToken) -> ViewHandle {
        let (surface, frames) = WatchSurface::channel();
        let client = Arc::clone(&self.client);
        info!(link = %link, "opening linked view");
        match link {
            RowLink::Query { topic, key } => {
                let request = key_lookup(topic, key);
                let watch = QueryWatch::new(client, topic.clone(), request, self.query, vec![Box::new(surface)]);
                spawn_view(watch, frames, shutdown)
            }
            RowLink::Queue(name) => {
                let target = QueueTarget::Messages(name.clone());
                let watch = QueueWatch::new(client, target, self.queue, vec![Box::new(surface)]);
                spawn_view(watch, frames, shutdown)
            }
        }
    }
}
