pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::ListState;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  renderfns::draw_header(frame, chunks[0], &app.header_info(), app.tick());

  if let Some(view) = app.current_view_mut() {
    view.render(frame, chunks[1]);
  }

  let breadcrumb = app.view_breadcrumb();
  let status = app.view_status();
  renderfns::draw_footer(frame, chunks[2], &breadcrumb, status.as_deref());
}

/// Keep a list selection inside `len` items, selecting the first item when
/// there is none.
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    Some(i) if i >= len => state.select(Some(len - 1)),
    None => state.select(Some(0)),
    _ => {}
  }
}
