/*
[INPUT]:  TUI app state and the latest view frame
[OUTPUT]: UI component render functions and module exports
[POS]:    TUI UI module root
[UPDATE]: When adding panes
*/

mod layout;
mod logs;
mod table;

pub(in crate::tui) use layout::draw_footer;
pub(in crate::tui) use logs::draw_logs;
pub(in crate::tui) use table::draw_table;
