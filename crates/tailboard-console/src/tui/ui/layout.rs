/*
[INPUT]:  AppState status and the latest frame status
[OUTPUT]: Status line, hotkey footer, and shared styles
[POS]:    TUI UI layout helpers
[UPDATE]: When changing hotkeys or palette
*/

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::tui::app::AppState;

pub(in crate::tui) fn border_style() -> Style {
    Style::default().fg(Color::Magenta)
}

pub(in crate::tui) fn header_style() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}

pub(in crate::tui) fn draw_footer(
    frame: &mut ratatui::Frame,
    area: ratatui::layout::Rect,
    app: &AppState,
) {
    let key_style = Style::default()
        .fg(Color::Black)
        .bg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let status = app
        .frame
        .as_ref()
        .map(|frame| frame.status.summary())
        .unwrap_or_else(|| "starting".to_string());

    let keys = Line::from(vec![
        Span::styled("[Space/p]", key_style),
        Span::raw(" Play/Pause  "),
        Span::styled("[o]", key_style),
        Span::raw(" Output  "),
        Span::styled("[d]", key_style),
        Span::raw(" Diagnostics  "),
        Span::styled("[Up/Down/PgUp/PgDn]", key_style),
        Span::raw(" Select  "),
        Span::styled("[Enter]", key_style),
        Span::raw(" Open  "),
        Span::styled(if app.depth > 1 { "[Esc/Bksp]" } else { "[Esc]" }, key_style),
        Span::raw(if app.depth > 1 { " Back  " } else { " Quit  " }),
        Span::styled("[q]", key_style),
        Span::raw(" Quit  "),
        Span::raw(format!("Status: {}", app.status_message)),
    ]);
    let state = Line::from(Span::raw(status));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style())
        .title("Hotkeys");
    let widget = Paragraph::new(Text::from(vec![state, keys]))
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(widget, area);
}
