/*
[INPUT]:  DiagnosticsHandle snapshots for UI
[OUTPUT]: Diagnostics pane rendered into Ratatui frame
[POS]:    TUI UI diagnostics rendering
[UPDATE]: When changing diagnostics pane layout
*/

use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};

use super::layout::border_style;
use crate::tui::diagnostics::{DiagnosticsHandle, lock};

pub(in crate::tui) fn draw_logs(
    frame: &mut ratatui::Frame,
    area: ratatui::layout::Rect,
    diagnostics: &DiagnosticsHandle,
) {
    let available = area.height.saturating_sub(2) as usize;
    let lines = lock(diagnostics).tail(available);
    let text = lines.into_iter().map(Line::from).collect::<Vec<_>>();
    let widget = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style())
            .title("Diagnostics"),
    );
    frame.render_widget(widget, area);
}
