/*
[INPUT]:  View handle and diagnostics buffer from the binary entry point
[OUTPUT]: Ratatui-based terminal UI for one view
[POS]:    TUI module for the tailboard binary
[UPDATE]: When changing TUI layout, keybindings, or runtime controls
*/

mod app;
mod diagnostics;
mod events;
mod runtime;
mod terminal;
mod ui;

pub(crate) use diagnostics::{DIAGNOSTICS_CAPACITY, DiagnosticLines, DiagnosticsHandle, DiagnosticsWriterFactory};
pub(crate) use runtime::run_tui;
