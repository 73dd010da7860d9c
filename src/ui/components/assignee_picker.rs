use super::KeyResult;
use crate::github::types::User;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState};

/// Events emitted by the assignee picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssigneeEvent {
  /// `None` clears the assignee
  Selected(Option<User>),
  Cancelled,
}

/// Overlay listing collaborators, preceded by an "Unassigned" entry
#[derive(Debug, Clone, Default)]
pub struct AssigneePicker {
  active: bool,
  users: Vec<User>,
  selected: usize,
  title: String,
}

impl AssigneePicker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Show the picker with the current assignee preselected
  pub fn show(&mut self, title: String, users: Vec<User>, current: Option<&User>) {
    self.selected = current
      .and_then(|c| users.iter().position(|u| u.id == c.id))
      .map_or(0, |i| i + 1);
    self.active = true;
    self.users = users;
    self.title = title;
  }

  pub fn hide(&mut self) {
    self.active = false;
    self.users.clear();
    self.selected = 0;
  }

  fn entries(&self) -> usize {
    self.users.len() + 1
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<AssigneeEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc | KeyCode::Char('q') => {
        self.hide();
        KeyResult::Event(AssigneeEvent::Cancelled)
      }
      KeyCode::Enter => {
        let choice = match self.selected {
          0 => None,
          i => self.users.get(i - 1).cloned(),
        };
        self.hide();
        KeyResult::Event(AssigneeEvent::Selected(choice))
      }
      KeyCode::Char('j') | KeyCode::Down => {
        self.selected = (self.selected + 1) % self.entries();
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.selected = self.selected.checked_sub(1).unwrap_or(self.entries() - 1);
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  /// Render the picker overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let max_name_len = self
      .users
      .iter()
      .map(|u| u.login.chars().count())
      .max()
      .unwrap_or(0)
      .max(self.title.chars().count());
    let width = (max_name_len as u16 + 6)
      .max(20)
      .min(area.width.saturating_sub(4));
    let height = (self.entries() as u16 + 2).min(area.height.saturating_sub(4)).max(3);

    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let mut items = vec![ListItem::new(Line::from(Span::styled(
      "Unassigned",
      Style::default().fg(Color::DarkGray).italic(),
    )))];
    items.extend(self.users.iter().map(|user| {
      ListItem::new(Line::from(Span::styled(
        user.login.as_str(),
        Style::default().fg(Color::Cyan),
      )))
    }));

    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default();
    state.select(Some(self.selected));
    frame.render_stateful_widget(list, inner, &mut state);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn users() -> Vec<User> {
    vec![
      User {
        id: 1,
        login: "alice".into(),
      },
      User {
        id: 2,
        login: "bob".into(),
      },
    ]
  }

  #[test]
  fn test_inactive_picker_ignores_keys() {
    let mut picker = AssigneePicker::new();
    assert_eq!(picker.handle_key(key(KeyCode::Enter)), KeyResult::NotHandled);
  }

  #[test]
  fn test_select_collaborator() {
    let mut picker = AssigneePicker::new();
    picker.show("Assign #1".into(), users(), None);
    picker.handle_key(key(KeyCode::Char('j')));
    picker.handle_key(key(KeyCode::Char('j')));
    let result = picker.handle_key(key(KeyCode::Enter));
    assert_eq!(
      result,
      KeyResult::Event(AssigneeEvent::Selected(Some(users()[1].clone())))
    );
    assert!(!picker.is_active());
  }

  #[test]
  fn test_current_assignee_preselected_and_unassign() {
    let mut picker = AssigneePicker::new();
    let all = users();
    picker.show("Assign #1".into(), all.clone(), Some(&all[0]));
    picker.handle_key(key(KeyCode::Char('k')));
    assert_eq!(
      picker.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(AssigneeEvent::Selected(None))
    );
  }

  #[test]
  fn test_wraps_around() {
    let mut picker = AssigneePicker::new();
    picker.show("Assign".into(), users(), None);
    picker.handle_key(key(KeyCode::Up));
    assert_eq!(
      picker.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(AssigneeEvent::Selected(Some(users()[1].clone())))
    );
  }

  #[test]
  fn test_escape_cancels() {
    let mut picker = AssigneePicker::new();
    picker.show("Assign".into(), users(), None);
    assert_eq!(
      picker.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(AssigneeEvent::Cancelled)
    );
  }
}
