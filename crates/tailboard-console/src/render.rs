/*
[INPUT]:  LogBuffer snapshots, view status, optional notice text
[OUTPUT]: Full-replace TableFrame renditions pushed to HTML files and the TUI
[POS]:    Renderer - fixed-cadence presentation decoupled from fetching
[UPDATE]: When adding layouts, columns, or render surfaces
*/

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::fs;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::log_buffer::LogBuffer;
use crate::poller::PollState;
use crate::row::{RenderedRow, escape_html};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Timestamp,
    Queue,
    Type,
    Key,
    Value,
    Attempts,
    NextAttempt,
    Size,
    Count,
}

impl Column {
    pub fn label(&self) -> &'static str {
        match self {
            Column::Timestamp => "Time",
            Column::Queue => "Queue",
            Column::Type => "Type",
            Column::Key => "Key",
            Column::Value => "Value",
            Column::Attempts => "Attempts",
            Column::NextAttempt => "Next Attempt",
            Column::Size => "Size",
            Column::Count => "Count",
        }
    }

    /// Plain-text cell for terminal output.
    pub fn plain<'a>(&self, row: &'a RenderedRow) -> std::borrow::Cow<'a, str> {
        use std::borrow::Cow;
        match self {
            Column::Timestamp => Cow::Borrowed(row.timestamp.as_str()),
            Column::Queue => Cow::Borrowed(row.queue.plain()),
            Column::Type => Cow::Borrowed(row.kind.plain()),
            Column::Key => Cow::Borrowed(row.key.plain()),
            Column::Value | Column::Size | Column::Count => Cow::Borrowed(row.value.plain()),
            Column::Attempts => Cow::Owned(row.attempts.map(|n| n.to_string()).unwrap_or_default()),
            Column::NextAttempt => Cow::Borrowed(row.next_attempt.as_str()),
        }
    }

    /// HTML-escaped cell.
    pub fn html<'a>(&self, row: &'a RenderedRow) -> std::borrow::Cow<'a, str> {
        use std::borrow::Cow;
        match self {
            Column::Queue => Cow::Borrowed(row.queue.html()),
            Column::Type => Cow::Borrowed(row.kind.html()),
            Column::Key => Cow::Borrowed(row.key.html()),
            Column::Value | Column::Size | Column::Count => Cow::Borrowed(row.value.html()),
            // Formatted locally; never contain markup.
            Column::Timestamp | Column::Attempts | Column::NextAttempt => self.plain(row),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLayout {
    /// Raw topic lines, rendered preformatted.
    Lines,
    Events,
    Tasks,
    Queue,
    Queues,
    Keys,
}

impl TableLayout {
    pub fn columns(&self) -> &'static [Column] {
        match self {
            TableLayout::Lines => &[Column::Value],
            TableLayout::Events => &[
                Column::Timestamp,
                Column::Queue,
                Column::Type,
                Column::Key,
                Column::Value,
            ],
            TableLayout::Tasks => &[Column::Timestamp, Column::Type, Column::Key, Column::Value],
            TableLayout::Queue => &[
                Column::Timestamp,
                Column::Key,
                Column::Value,
                Column::Attempts,
                Column::NextAttempt,
            ],
            TableLayout::Queues => &[Column::Key, Column::Size],
            TableLayout::Keys => &[Column::Key, Column::Count],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewStatus {
    pub state: PollState,
    /// `None` for views without an output filter.
    pub show_output: Option<bool>,
    pub cursor: String,
    pub last_error: Option<String>,
    pub rows: usize,
    pub capacity: usize,
}

impl ViewStatus {
    pub fn new(state: PollState, rows: usize, capacity: usize) -> Self {
        Self {
            state,
            show_output: None,
            cursor: String::new(),
            last_error: None,
            rows,
            capacity,
        }
    }

    pub fn summary(&self) -> String {
        let mut text = match self.state {
            PollState::Running => "running".to_string(),
            PollState::Paused => "paused".to_string(),
        };
        let _ = write!(text, " | {}/{} rows", self.rows, self.capacity);
        if let Some(show) = self.show_output {
            text.push_str(if show { " | output shown" } else { " | output hidden" });
        }
        if !self.cursor.is_empty() {
            let _ = write!(text, " | at {}", self.cursor);
        }
        if let Some(error) = &self.last_error {
            let _ = write!(text, " | last error: {error}");
        }
        text
    }
}

/// One complete rendition of a view.
#[derive(Debug, Clone, PartialEq)]
pub struct TableFrame {
    pub title: String,
    pub layout: TableLayout,
    pub rows: Vec<Arc<RenderedRow>>,
    pub status: ViewStatus,
    /// Text shown below the table (query errors, empty markers). Raw, escaped on output.
    pub notice: Option<String>,
}

impl TableFrame {
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        let _ = write!(
            html,
            "<div class=\"tailboard-view\">\n<h2>{}</h2>\n<p class=\"status\">{}</p>\n",
            escape_html(&self.title),
            escape_html(&self.status.summary())
        );

        if self.layout == TableLayout::Lines {
            html.push_str("<pre>");
            for (index, row) in self.rows.iter().enumerate() {
                if index > 0 {
                    html.push('\n');
                }
                html.push_str(row.value.html().trim_end_matches(['\n', '\r']));
            }
            html.push_str("</pre>\n");
        } else {
            let columns = self.layout.columns();
            html.push_str("<table>\n<thead><tr>");
            for column in columns {
                let _ = write!(html, "<th>{}</th>", column.label());
            }
            html.push_str("</tr></thead>\n<tbody>\n");
            for row in &self.rows {
                match row.style.css_class() {
                    Some(class) => {
                        let _ = write!(html, "<tr class=\"{class}\">");
                    }
                    None => html.push_str("<tr>"),
                }
                for column in columns {
                    match (&row.link, column) {
                        (Some(link), Column::Key) => {
                            let _ = write!(
                                html,
                                "<td><a href=\"{}\">{}</a></td>",
                                escape_html(&link.href()),
                                column.html(row)
                            );
                        }
                        _ => {
                            let _ = write!(html, "<td>{}</td>", column.html(row));
                        }
                    }
                }
                html.push_str("</tr>\n");
            }
            html.push_str("</tbody>\n</table>\n");
        }

        if let Some(notice) = &self.notice {
            let _ = writeln!(html, "<p class=\"notice\">{}</p>", escape_html(notice));
        }
        html.push_str("</div>\n");
        html
    }

    pub fn to_html_document(&self) -> String {
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
             <meta http-equiv=\"refresh\" content=\"1\">\n<title>{}</title>\n\
             <style>{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
            escape_html(&self.title),
            STYLESHEET,
            self.to_html()
        )
    }
}

const STYLESHEET: &str = "body{font-family:monospace}\
table{border-collapse:collapse}td,th{padding:2px 8px;text-align:left;vertical-align:top}\
.task-error{color:#b00}.task-output{color:#666}.task-begin-complete{font-weight:bold}\
.queue-retrying{color:#b00}.queue-attempted{color:#b60}.queue-waiting{color:#060}\
.notice{font-style:italic}";

pub trait RenderSurface: Send {
    fn present(&mut self, frame: &Arc<TableFrame>) -> Result<()>;

    /// Flush and release the surface when its view stops.
    fn close(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
        async { Ok(()) }.boxed()
    }
}

pub type FrameReceiver = watch::Receiver<Option<Arc<TableFrame>>>;

/// Publishes frames to watchers, e.g. the terminal UI.
pub struct WatchSurface {
    sender: watch::Sender<Option<Arc<TableFrame>>>,
}

impl WatchSurface {
    pub fn channel() -> (Self, FrameReceiver) {
        let (sender, receiver) = watch::channel(None);
        (Self { sender }, receiver)
    }

}

impl RenderSurface for WatchSurface {
    fn present(&mut self, frame: &Arc<TableFrame>) -> Result<()> {
        self.sender.send_replace(Some(Arc::clone(frame)));
        Ok(())
    }
}

/// Rewrites an HTML document on every frame via a temporary file and rename.
/// Writes happen on a background task; frames arriving while a write is running
/// collapse into the latest one.
pub struct HtmlFileSurface {
    path: PathBuf,
    documents: watch::Sender<Option<String>>,
    writer: JoinHandle<()>,
}

impl HtmlFileSurface {
    /// Must be called from within a Tokio runtime.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut temp = path.clone().into_os_string();
        temp.push(".tmp");
        let (documents, receiver) = watch::channel(None);
        let writer = tokio::spawn(write_documents(receiver, path.clone(), PathBuf::from(temp)));
        Self {
            path,
            documents,
            writer,
        }
    }
}

impl RenderSurface for HtmlFileSurface {
    fn present(&mut self, frame: &Arc<TableFrame>) -> Result<()> {
        self.documents
            .send(Some(frame.to_html_document()))
            .map_err(|_| anyhow!("html writer for {} stopped", self.path.display()))
    }

    /// Stop accepting frames and wait until the latest one is on disk.
    fn close(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
        let Self {
            path,
            documents,
            writer,
        } = *self;
        drop(documents);
        async move {
            writer
                .await
                .with_context(|| format!("html writer for {}", path.display()))
        }
        .boxed()
    }
}

async fn write_documents(
    mut documents: watch::Receiver<Option<String>>,
    path: PathBuf,
    temp_path: PathBuf,
) {
    while documents.changed().await.is_ok() {
        let Some(document) = documents.borrow_and_update().clone() else {
            continue;
        };
        if let Err(err) = replace_file(&path, &temp_path, document).await {
            warn!(error = %format!("{err:#}"), "html output failed");
        }
    }
    debug!(path = %path.display(), "html writer stopped");
}

async fn replace_file(path: &Path, temp_path: &Path, document: String) -> Result<()> {
    fs::write(temp_path, document)
        .await
        .with_context(|| format!("write {}", temp_path.display()))?;
    fs::rename(temp_path, path)
        .await
        .with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

pub struct Renderer {
    title: String,
    layout: TableLayout,
    surfaces: Vec<Box<dyn RenderSurface>>,
}

impl Renderer {
    pub fn new(title: impl Into<String>, layout: TableLayout, surfaces: Vec<Box<dyn RenderSurface>>) -> Self {
        Self {
            title: title.into(),
            layout,
            surfaces,
        }
    }

    /// Render and present if the buffer is dirty; the flag is cleared. Returns whether a frame went out.
    pub fn tick(&mut self, buffer: &mut LogBuffer, status: ViewStatus, notice: Option<String>) -> bool {
        if !buffer.take_dirty() {
            return false;
        }
        let frame = self.render(buffer.snapshot(), status, notice);
        self.present(&frame);
        true
    }

    /// Render unconditionally, clearing the dirty flag.
    pub fn refresh(&mut self, buffer: &mut LogBuffer, status: ViewStatus, notice: Option<String>) {
        buffer.take_dirty();
        let frame = self.render(buffer.snapshot(), status, notice);
        self.present(&frame);
    }

    pub fn render(
        &self,
        rows: Vec<Arc<RenderedRow>>,
        status: ViewStatus,
        notice: Option<String>,
    ) -> Arc<TableFrame> {
        Arc::new(TableFrame {
            title: self.title.clone(),
            layout: self.layout,
            rows,
            status,
            notice,
        })
    }

    pub fn present(&mut self, frame: &Arc<TableFrame>) {
        for surface in &mut self.surfaces {
            if let Err(err) = surface.present(frame) {
                warn!(error = %format!("{err:#}"), "render surface failed");
            }
        }
        debug!(title = %frame.title, rows = frame.rows.len(), "frame presented");
    }

    /// Close every surface once the view has stopped.
    pub async fn close(self) {
        for surface in self.surfaces {
            if let Err(err) = surface.close().await {
                warn!(error = %format!("{err:#}"), "render surface did not close cleanly");
            }
        }
    }
}
