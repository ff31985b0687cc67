/*
[INPUT]:  Latest TableFrame and selected row
[OUTPUT]: Log table (or preformatted lines) rendered into Ratatui frame
[POS]:    TUI UI main table rendering
[UPDATE]: When changing column sizing or row styling
*/

use ratatui::layout::Constraint;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};
use unicode_width::UnicodeWidthStr;

use tailboard_console::render::Column;
use tailboard_console::{RowStyle, TableFrame, TableLayout};

use super::layout::{border_style, header_style};

const MAX_FIXED_WIDTH: u16 = 40;

fn row_style(style: RowStyle) -> Style {
    match style {
        RowStyle::Error | RowStyle::Retrying => Style::default().fg(Color::LightRed),
        RowStyle::Output => Style::default().fg(Color::DarkGray),
        RowStyle::Lifecycle => Style::default().add_modifier(Modifier::BOLD),
        RowStyle::Attempted => Style::default().fg(Color::Yellow),
        RowStyle::Waiting => Style::default().fg(Color::LightGreen),
        RowStyle::Plain => Style::default(),
    }
}

/// Rows to show so that `selected` stays on screen.
fn visible_window(selected: usize, capacity: usize, len: usize) -> std::ops::Range<usize> {
    let start = (selected + 1).saturating_sub(capacity).min(len);
    start..(start + capacity).min(len)
}

/// Widths of every column but the last, sized to the widest cell; the last fills the rest.
fn column_constraints(frame: &TableFrame, visible: &[usize]) -> Vec<Constraint> {
    let columns = frame.layout.columns();
    columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            if index + 1 == columns.len() {
                return Constraint::Min(10);
            }
            let widest = visible
                .iter()
                .map(|&row| column.plain(&frame.rows[row]).width())
                .chain(std::iter::once(column.label().width()))
                .max()
                .unwrap_or(0);
            Constraint::Length((widest as u16).min(MAX_FIXED_WIDTH))
        })
        .collect()
}

pub(in crate::tui) fn draw_table(
    frame: &mut ratatui::Frame,
    area: ratatui::layout::Rect,
    table_frame: Option<&TableFrame>,
    selected: usize,
) {
    let Some(table_frame) = table_frame else {
        let waiting = Paragraph::new("waiting for first frame").block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style()),
        );
        frame.render_widget(waiting, area);
        return;
    };

    let mut title = table_frame.title.clone();
    if let Some(notice) = &table_frame.notice {
        title = format!("{title} - {notice}");
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style())
        .title(title);

    let capacity = area.height.saturating_sub(3) as usize;
    let visible: Vec<usize> = visible_window(selected, capacity, table_frame.rows.len()).collect();
    let highlight = |index: usize, style: Style| {
        if index == selected {
            style.add_modifier(Modifier::REVERSED)
        } else {
            style
        }
    };

    if table_frame.layout == TableLayout::Lines {
        let lines: Vec<Line> = visible
            .iter()
            .map(|&row| {
                Line::from(table_frame.rows[row].value.plain().to_string())
                    .style(highlight(row, Style::default()))
            })
            .collect();
        frame.render_widget(Paragraph::new(lines).block(block), area);
        return;
    }

    let columns: &[Column] = table_frame.layout.columns();
    let header = Row::new(columns.iter().map(|column| Cell::from(column.label())))
        .style(header_style());
    let rows = visible.iter().map(|&index| {
        let row = &table_frame.rows[index];
        Row::new(
            columns
                .iter()
                .map(|column| Cell::from(column.plain(row).into_owned())),
        )
        .style(highlight(index, row_style(row.style)))
    });

    let table = Table::new(rows, column_constraints(table_frame, &visible))
        .header(header)
        .block(block);
    frame.render_widget(table, area);
}
