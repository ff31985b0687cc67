/*
[INPUT]:  Root ViewHandle, DrillDown launcher, diagnostics buffer, crossterm input
[OUTPUT]: Ratatui run loop presenting the latest frame with hotkeys
[POS]:    TUI runtime loop
[UPDATE]: When changing TUI layout, keybindings, or runtime controls
*/

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event as CrosstermEvent, KeyEventKind};
use ratatui::layout::{Constraint, Direction, Layout};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tailboard_console::{DrillDown, ViewHandle};

use super::app::AppState;
use super::diagnostics::DiagnosticsHandle;
use super::events::{KeyOutcome, handle_key_event};
use super::terminal::TerminalGuard;
use super::ui::{draw_footer, draw_logs, draw_table};

const UI_TICK_INTERVAL: Duration = Duration::from_millis(250);
const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(200);

enum UiEvent {
    Input(CrosstermEvent),
}

/// Drive the terminal UI until `q` or `shutdown`. Drill-down views opened here are
/// stopped before returning; the root view is stopped by the caller.
pub async fn run_tui(
    handle: &ViewHandle,
    drill_down: &DrillDown,
    diagnostics: DiagnosticsHandle,
    shutdown: CancellationToken,
) -> Result<()> {
    let mut terminal = TerminalGuard::new()?;
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let input_shutdown = CancellationToken::new();
    let input_shutdown_clone = input_shutdown.clone();

    tokio::task::spawn_blocking(move || {
        while !input_shutdown_clone.is_cancelled() {
            if crossterm::event::poll(INPUT_POLL_INTERVAL).unwrap_or(false) {
                if let Ok(event) = crossterm::event::read() {
                    if event_tx.send(UiEvent::Input(event)).is_err() {
                        break;
                    }
                }
            }
        }
    });

    let mut children: Vec<ViewHandle> = Vec::new();
    let mut frames = handle.frames();
    let mut app = AppState::new(diagnostics);
    app.set_frame(frames.borrow_and_update().clone());

    let mut tick = tokio::time::interval(UI_TICK_INTERVAL);
    let mut frames_open = true;
    let mut should_quit = false;

    while !should_quit {
        terminal.draw(|frame| draw_ui(frame, &app))?;

        tokio::select! {
            _ = shutdown.cancelled() => should_quit = true,
            _ = tick.tick() => {}
            changed = frames.changed(), if frames_open => {
                if changed.is_err() {
                    frames_open = false;
                    app.status_message = "view stopped".to_string();
                } else {
                    app.set_frame(frames.borrow_and_update().clone());
                }
            }
            maybe_event = event_rx.recv() => {
                if let Some(UiEvent::Input(CrosstermEvent::Key(key))) = maybe_event
                    && key.kind != KeyEventKind::Release
                {
                    match handle_key_event(&mut app, key.code) {
                        KeyOutcome::Quit => should_quit = true,
                        KeyOutcome::Command(command) => {
                            debug!(?command, "view command");
                            let top = children.last().unwrap_or(handle);
                            if let Err(err) = top.commands().try_send(command) {
                                warn!(error = %err, "view command dropped");
                                app.status_message = format!("command dropped: {err}");
                            }
                        }
                        KeyOutcome::Open(link) => {
                            let child = drill_down.open(&link, shutdown.child_token());
                            frames = child.frames();
                            frames_open = true;
                            children.push(child);
                            app.show_view(frames.borrow_and_update().clone(), children.len() + 1);
                            app.status_message = format!("opened {link}");
                        }
                        KeyOutcome::Back => {
                            if let Some(child) = children.pop() {
                                close_view(child).await;
                            }
                            frames = children.last().unwrap_or(handle).frames();
                            frames_open = true;
                            app.show_view(frames.borrow_and_update().clone(), children.len() + 1);
                            app.status_message = "back".to_string();
                        }
                        KeyOutcome::Handled => {}
                    }
                }
            }
        }
    }

    input_shutdown.cancel();
    while let Some(child) = children.pop() {
        close_view(child).await;
    }
    Ok(())
}

async fn close_view(view: ViewHandle) {
    match view.shutdown().await {
        Ok(()) => info!("drill-down view closed"),
        Err(err) => warn!(error = %err, "drill-down view did not stop cleanly"),
    }
}

fn draw_ui(frame: &mut ratatui::Frame, app: &AppState) {
    let area = frame.area();
    let mut constraints = vec![Constraint::Min(6)];
    if app.show_diagnostics {
        constraints.push(Constraint::Percentage(30));
    }
    constraints.push(Constraint::Length(4));

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    draw_table(frame, layout[0], app.frame.as_deref(), app.selected);
    if app.show_diagnostics {
        draw_logs(frame, layout[1], &app.diagnostics);
    }
    draw_footer(frame, layout[layout.len() - 1], app);
}
