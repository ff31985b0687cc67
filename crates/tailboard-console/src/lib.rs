/*
[INPUT]:  Public API exports for the tailboard-console crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod config;
pub mod drill_down;
pub mod log_buffer;
pub mod poller;
pub mod query_watch;
pub mod queue_watch;
pub mod render;
pub mod row;
pub mod source;
pub mod view;

// Re-export main types for convenience
pub use config::DashboardConfig;
pub use drill_down::DrillDown;
pub use log_buffer::LogBuffer;
pub use poller::{PollEvent, PollState, Poller, PollerConfig};
pub use query_watch::{QuerySettings, QueryWatch};
pub use queue_watch::{QueueSettings, QueueTarget, QueueWatch};
pub use render::{
    FrameReceiver, HtmlFileSurface, RenderSurface, Renderer, TableFrame, TableLayout,
    WatchSurface,
};
pub use row::{RenderedRow, RowLink, RowStyle, TimestampZone};
pub use source::{Cursor, LogSource, StreamPath, TailSource};
pub use view::{TailTarget, TailView, ViewActor, ViewCommand, ViewHandle, ViewSettings, spawn_view};
