/*
[INPUT]:  Batches of LogEntry values delivered by pollers
[OUTPUT]: Capacity-bounded, newest-first sequence of RenderedRow plus a dirty flag
[POS]:    View data store between Poller and Renderer
[UPDATE]: When changing eviction, filtering, or dirty tracking
*/

use std::collections::VecDeque;
use std::sync::Arc;

use tailboard_adapter::LogEntry;

use crate::row::{RenderedRow, RowLink, TimestampZone};

#[derive(Debug)]
pub struct LogBuffer {
    rows: VecDeque<Arc<RenderedRow>>,
    capacity: usize,
    show_output: bool,
    zone: TimestampZone,
    dirty: bool,
    /// Topic whose `ID` index the row keys point into.
    link_topic: Option<String>,
}

impl LogBuffer {
    pub fn new(capacity: usize, zone: TimestampZone) -> Self {
        Self {
            rows: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            show_output: true,
            zone,
            dirty: false,
            link_topic: None,
        }
    }

    /// Link every pushed row to a key lookup in `topic`.
    pub fn link_keys_to(mut self, topic: impl Into<String>) -> Self {
        self.link_topic = Some(topic.into());
        self
    }

    /// Prepend each entry in arrival order (the last entry of a batch ends up first),
    /// then drop the oldest rows beyond capacity. Returns the number of rows retained.
    pub fn push(&mut self, entries: &[LogEntry]) -> usize {
        let mut retained = 0;
        for entry in entries {
            if !self.show_output && entry.kind.is_output() {
                continue;
            }
            let link = self
                .link_topic
                .as_deref()
                .and_then(|topic| RowLink::query(topic, &entry.key));
            let row = RenderedRow::from_entry(entry, self.zone).with_link(link);
            self.rows.push_front(Arc::new(row));
            retained += 1;
        }
        self.rows.truncate(self.capacity);
        if retained > 0 {
            self.dirty = true;
        }
        retained
    }

    /// Replace the contents with pre-built rows, kept in the given order.
    pub fn replace(&mut self, rows: impl IntoIterator<Item = RenderedRow>) {
        self.rows = rows
            .into_iter()
            .take(self.capacity)
            .map(Arc::new)
            .collect();
        self.dirty = true;
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.dirty = true;
    }

    pub fn snapshot(&self) -> Vec<Arc<RenderedRow>> {
        self.rows.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn zone(&self) -> TimestampZone {
        self.zone
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Read and reset the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn show_output(&self) -> bool {
        self.show_output
    }

    /// Filtered entries were never retained, so a flag change empties the buffer.
    /// Returns whether the flag changed.
    pub fn set_show_output(&mut self, show: bool) -> bool {
        if self.show_output == show {
            return false;
        }
        self.show_output = show;
        self.clear();
        true
    }
}
