/*
[INPUT]:  Latest TableFrame from the view and key-driven UI state
[OUTPUT]: AppState consumed by the draw functions
[POS]:    TUI application state
[UPDATE]: When adding UI panes or navigation state
*/

use std::sync::Arc;

use tailboard_console::{RowLink, TableFrame};

use super::diagnostics::DiagnosticsHandle;

const PAGE_ROWS: usize = 20;

pub(crate) struct AppState {
    pub(crate) frame: Option<Arc<TableFrame>>,
    /// Highlighted row; 0 follows the newest rows.
    pub(crate) selected: usize,
    /// Open views, the root view included.
    pub(crate) depth: usize,
    pub(crate) show_diagnostics: bool,
    pub(crate) diagnostics: DiagnosticsHandle,
    pub(crate) status_message: String,
}

impl AppState {
    pub(crate) fn new(diagnostics: DiagnosticsHandle) -> Self {
        Self {
            frame: None,
            selected: 0,
            depth: 1,
            show_diagnostics: false,
            diagnostics,
            status_message: String::from("ready"),
        }
    }

    pub(crate) fn row_count(&self) -> usize {
        self.frame.as_ref().map(|frame| frame.rows.len()).unwrap_or(0)
    }

    pub(crate) fn set_frame(&mut self, frame: Option<Arc<TableFrame>>) {
        self.frame = frame;
        self.clamp_selection();
    }

    /// Switch to another view's frames after opening or closing a drill-down.
    pub(crate) fn show_view(&mut self, frame: Option<Arc<TableFrame>>, depth: usize) {
        self.depth = depth;
        self.selected = 0;
        self.set_frame(frame);
    }

    pub(crate) fn selected_link(&self) -> Option<RowLink> {
        let frame = self.frame.as_ref()?;
        frame.rows.get(self.selected)?.link.clone()
    }

    pub(crate) fn scroll_by(&mut self, delta: isize) {
        self.selected = self.selected.saturating_add_signed(delta);
        self.clamp_selection();
    }

    pub(crate) fn page(&mut self, down: bool) {
        let delta = PAGE_ROWS as isize;
        self.scroll_by(if down { delta } else { -delta });
    }

    pub(crate) fn toggle_diagnostics(&mut self) {
        self.show_diagnostics = !self.show_diagnostics;
    }

    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.row_count().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::diagnostics::DiagnosticLines;
    use tailboard_console::render::ViewStatus;
    use tailboard_console::{PollState, RenderedRow, TableLayout, TimestampZone};
    use tailboard_adapter::LogEntry;

    fn frame(rows: usize) -> Arc<TableFrame> {
        let rows = (0..rows)
            .map(|i| {
                Arc::new(RenderedRow::from_entry(
                    &LogEntry::line(i.to_string()),
                    TimestampZone::Utc,
                ))
            })
            .collect();
        Arc::new(TableFrame {
            title: "t".to_string(),
            layout: TableLayout::Lines,
            rows,
            status: ViewStatus::new(PollState::Running, 0, 0),
            notice: None,
        })
    }

    #[test]
    fn selection_is_clamped_to_rows() {
        let mut app = AppState::new(DiagnosticLines::handle(10));
        app.scroll_by(5);
        assert_eq!(app.selected, 0);

        app.set_frame(Some(frame(30)));
        app.page(true);
        assert_eq!(app.selected, 20);
        app.page(true);
        assert_eq!(app.selected, 29);
        app.scroll_by(-100);
        assert_eq!(app.selected, 0);

        app.selected = 29;
        app.set_frame(Some(frame(3)));
        assert_eq!(app.selected, 2);
    }

    #[test]
    fn selected_row_exposes_its_link() {
        let mut app = AppState::new(DiagnosticLines::handle(10));
        assert_eq!(app.selected_link(), None);

        let mut linked = (*frame(2)).clone();
        linked.rows[1] = Arc::new(
            (*linked.rows[1])
                .clone()
                .with_link(RowLink::query("tasks", "task-7")),
        );
        app.set_frame(Some(Arc::new(linked)));
        assert_eq!(app.selected_link(), None);
        app.scroll_by(1);
        assert_eq!(app.selected_link(), RowLink::query("tasks", "task-7"));

        app.show_view(Some(frame(5)), 2);
        assert_eq!(app.selected, 0);
        assert_eq!(app.depth, 2);
    }
}
