/*
[INPUT]:  Crossterm key codes
[OUTPUT]: UI state changes and view commands
[POS]:    TUI key handling
[UPDATE]: When adding or changing hotkeys
*/

use crossterm::event::KeyCode;

use tailboard_console::{RowLink, ViewCommand};

use super::app::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum KeyOutcome {
    Quit,
    Command(ViewCommand),
    /// Open the view behind the selected row.
    Open(RowLink),
    /// Close the top drill-down view.
    Back,
    Handled,
}

/// Handles key events for the TUI.
pub(crate) fn handle_key_event(app: &mut AppState, key: KeyCode) -> KeyOutcome {
    match key {
        KeyCode::Char('q') => KeyOutcome::Quit,
        KeyCode::Esc | KeyCode::Backspace if app.depth > 1 => KeyOutcome::Back,
        KeyCode::Esc => KeyOutcome::Quit,
        KeyCode::Enter => match app.selected_link() {
            Some(link) => KeyOutcome::Open(link),
            None => {
                app.status_message = "nothing to open on this row".to_string();
                KeyOutcome::Handled
            }
        },
        KeyCode::Char(' ') | KeyCode::Char('p') => {
            app.status_message = "play/pause".to_string();
            KeyOutcome::Command(ViewCommand::TogglePause)
        }
        KeyCode::Char('o') => {
            app.selected = 0;
            app.status_message = "toggle output".to_string();
            KeyOutcome::Command(ViewCommand::ToggleOutput)
        }
        KeyCode::Char('d') => {
            app.toggle_diagnostics();
            KeyOutcome::Handled
        }
        KeyCode::Up => {
            app.scroll_by(-1);
            KeyOutcome::Handled
        }
        KeyCode::Down => {
            app.scroll_by(1);
            KeyOutcome::Handled
        }
        KeyCode::PageUp => {
            app.page(false);
            KeyOutcome::Handled
        }
        KeyCode::PageDown => {
            app.page(true);
            KeyOutcome::Handled
        }
        KeyCode::Home => {
            app.selected = 0;
            KeyOutcome::Handled
        }
        _ => KeyOutcome::Handled,
    }
}
