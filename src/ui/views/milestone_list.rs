use crate::app::Services;
use crate::github::types::{Milestone, MilestoneFilter};
use crate::query::{Query, QueryState};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{relative_due, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::BoardView;
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// Open milestones of the repository, followed by a "No milestone" entry
pub struct MilestoneListView {
  services: Services,
  query: Query<Vec<Milestone>>,
  list_state: ListState,
}

impl MilestoneListView {
  pub fn new(services: Services) -> Self {
    let github = services.github.clone();
    let mut query = Query::with_updates(move |sink| {
      let github = github.clone();
      async move {
        github
          .load_milestones(|cached| sink.provisional(cached))
          .await
          .map_err(|e| e.message())
      }
    });

    // Start fetching immediately
    query.fetch();

    Self {
      services,
      query,
      list_state: ListState::default(),
    }
  }

  fn milestones(&self) -> &[Milestone] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  /// Entries are the milestones plus the trailing "No milestone" entry
  fn entry_count(&self) -> usize {
    if self.query.data().is_some() {
      self.milestones().len() + 1
    } else {
      0
    }
  }

  fn selected_entry(&self) -> Option<(MilestoneFilter, Option<&Milestone>)> {
    let idx = self.list_state.selected()?;
    if idx >= self.entry_count() {
      return None;
    }
    match self.milestones().get(idx) {
      Some(m) => Some((MilestoneFilter::Number(m.number), Some(m))),
      None => Some((MilestoneFilter::None, None)),
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let count = self.entry_count();
    ensure_valid_selection(&mut self.list_state, count);

    let title = match self.query.state() {
      QueryState::Idle | QueryState::Loading => " Milestones (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Milestones (error: {}) ", e),
      QueryState::Success { data, .. } => format!(" Milestones ({}) ", data.len()),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.query.data().is_none() {
      let content = if self.query.is_error() {
        "Failed to load milestones. Press 'r' to retry."
      } else {
        "Loading milestones..."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let now = Utc::now();
    let title_width = (area.width as usize).saturating_sub(40).max(10);
    let mut items: Vec<ListItem> = self
      .milestones()
      .iter()
      .map(|milestone| {
        let due = milestone
          .due_on
          .map(|d| relative_due(d, now))
          .unwrap_or_default();
        let line = Line::from(vec![
          Span::styled(
            format!("{:<6}", format!("#{}", milestone.number)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(format!(
            "{:<width$}",
            truncate(&milestone.title, title_width),
            width = title_width
          )),
          Span::raw(" "),
          Span::styled(
            format!(
              "{:>4} open {:>4} closed",
              milestone.open_issues, milestone.closed_issues
            ),
            Style::default().fg(Color::Green),
          ),
          Span::raw("  "),
          Span::styled(due, Style::default().fg(Color::Yellow)),
        ]);
        ListItem::new(line)
      })
      .collect();

    items.push(ListItem::new(Line::from(Span::styled(
      "      No milestone",
      Style::default().fg(Color::DarkGray).italic(),
    ))));

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
        Some(ViewAction::None)
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
        Some(ViewAction::None)
      }
      _ => None,
    }
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('r') => {
        self.query.refetch();
        Some(ViewAction::None)
      }
      KeyCode::Enter => {
        let (filter, milestone) = self.selected_entry()?;
        Some(ViewAction::Push(Box::new(BoardView::new(
          self.services.clone(),
          filter,
          milestone.map(|m| m.title.clone()),
        ))))
      }
      KeyCode::Char('q') | KeyCode::Esc => Some(ViewAction::Pop),
      _ => None,
    }
  }
}

impl View for MilestoneListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_navigation(key)
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Milestones".to_string()
  }

  fn tick(&mut self) {
    self.query.poll();
    self.query.refetch_if_stale();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("enter", "open board").with_priority(10),
      ShortcutInfo::new("r", "refresh").with_priority(80),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::board::Categories;
  use crate::flash::FlashMessages;
  use crate::github::{GithubClient, IssueManager, TimeLabels};
  use crate::request::testing::*;
  use crossterm::event::KeyModifiers;
  use ratatui::backend::TestBackend;
  use serde_json::json;
  use std::sync::Arc;
  use std::time::Duration;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  async fn loaded_view() -> MilestoneListView {
    let transport = Arc::new(FakeTransport::new(|_| {
      Ok(json_response(
        200,
        json!([{"number": 4, "title": "Sprint 4", "description": null, "due_on": null}]),
      ))
    }));
    let github = GithubClient::new(client(transport), "a/b");
    let issues = IssueManager::new(github.clone(), Categories::default(), TimeLabels::default());
    let mut view = MilestoneListView::new(Services {
      github,
      issues,
      flash: FlashMessages::default(),
    });
    for _ in 0..200 {
      view.tick();
      if view.query.data().is_some() {
        break;
      }
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
    view
  }

  fn render(view: &mut MilestoneListView) {
    let mut terminal = Terminal::new(TestBackend::new(80, 10)).unwrap();
    terminal.draw(|frame| view.render(frame, frame.area())).unwrap();
  }

  #[tokio::test]
  async fn test_render_selects_first_entry() {
    let mut view = loaded_view().await;
    assert_eq!(view.entry_count(), 2);
    render(&mut view);
    assert_eq!(view.list_state.selected(), Some(0));
    assert!(matches!(
      view.selected_entry(),
      Some((MilestoneFilter::Number(4), Some(_)))
    ));
  }

  #[tokio::test]
  async fn test_selection_clamped_to_no_milestone_entry() {
    let mut view = loaded_view().await;
    render(&mut view);
    for _ in 0..5 {
      view.handle_key(key(KeyCode::Char('j')));
    }
    render(&mut view);
    assert_eq!(view.list_state.selected(), Some(1));
    assert!(matches!(view.selected_entry(), Some((MilestoneFilter::None, None))));
    assert!(matches!(view.handle_key(key(KeyCode::Enter)), ViewAction::Push(_)));
  }
}
