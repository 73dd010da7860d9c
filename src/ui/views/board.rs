use crate::app::Services;
use crate::board::{categorize, Bucket, Categories, DragState, PendingMove, TimeTotals};
use crate::github::issue_manager::format_minutes;
use crate::github::types::{BoardData, Issue, MilestoneFilter, User};
use crate::query::{Query, QueryState};
use crate::ui::components::{AssigneeEvent, AssigneePicker, KeyResult};
use crate::ui::renderfns::{label_color, relative_due, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

/// Result of a mutation: flash text for success or failure
type MutationOutcome = Result<String, String>;

/// Sprint board of one milestone: one column per category
pub struct BoardView {
  services: Services,
  milestone: MilestoneFilter,
  title: Option<String>,

  query: Query<BoardData>,

  // UI state
  selected_column: usize,
  selected_row: usize,
  drag: DragState,
  picker: AssigneePicker,
  picker_issue: Option<Issue>,

  // Mutations in flight report back here
  mutation_tx: mpsc::UnboundedSender<MutationOutcome>,
  mutation_rx: mpsc::UnboundedReceiver<MutationOutcome>,
  saving: usize,
}

impl BoardView {
  pub fn new(services: Services, milestone: MilestoneFilter, title: Option<String>) -> Self {
    let github = services.github.clone();
    let manager = services.issues.clone();
    let mut query = Query::with_updates(move |sink| {
      let github = github.clone();
      let manager = manager.clone();
      async move {
        let annotate = manager.clone();
        let mut board = github
          .load_board(milestone, move |mut cached| {
            annotate.annotate(&mut cached.issues);
            sink.provisional(cached);
          })
          .await
          .map_err(|e| e.message())?;
        manager.annotate(&mut board.issues);
        Ok(board)
      }
    })
    .with_stale_time(Duration::from_secs(120));

    // Start fetching immediately
    query.fetch();

    let (mutation_tx, mutation_rx) = mpsc::unbounded_channel();

    Self {
      services,
      milestone,
      title,
      query,
      selected_column: 0,
      selected_row: 0,
      drag: DragState::default(),
      picker: AssigneePicker::new(),
      picker_issue: None,
      mutation_tx,
      mutation_rx,
      saving: 0,
    }
  }

  fn categories(&self) -> &Categories {
    self.services.issues.categories()
  }

  /// Real issues of a column, in display order
  fn column_issues(&self, column: usize) -> Vec<&Issue> {
    let (Some(data), Some(category)) = (self.query.data(), self.categories().at(column)) else {
      return Vec::new();
    };
    let mut issues: Vec<&Issue> = data
      .issues
      .iter()
      .filter(|i| self.categories().is_member_of(i, &category.name))
      .collect();
    issues.sort_by_key(|i| i.created_at);
    issues
  }

  fn selected_issue(&self) -> Option<&Issue> {
    self
      .column_issues(self.selected_column)
      .get(self.selected_row)
      .copied()
  }

  fn clamp_selection(&mut self) {
    let columns = self.categories().len();
    if self.selected_column >= columns {
      self.selected_column = columns.saturating_sub(1);
    }
    let rows = self.column_issues(self.selected_column).len();
    if self.selected_row >= rows {
      self.selected_row = rows.saturating_sub(1);
    }
  }

  // ==========================================================================
  // Navigation
  // ==========================================================================

  fn navigate_rows(&mut self, direction: i32) {
    let len = self.column_issues(self.selected_column).len();
    if len == 0 {
      return;
    }
    self.selected_row = (self.selected_row as i32 + direction).rem_euclid(len as i32) as usize;
  }

  fn navigate_columns(&mut self, direction: i32) {
    let len = self.categories().len();
    if len == 0 {
      return;
    }
    self.selected_column = (self.selected_column as i32 + direction).rem_euclid(len as i32) as usize;
    // Reset selection within new column
    self.selected_row = 0;
  }

  /// Move the drop zone one column left or right of where it is now
  fn move_drop_zone(&mut self, direction: i32) {
    let categories = self.categories();
    let len = categories.len();
    if len == 0 {
      return;
    }
    let current = self
      .drag
      .drop_zone()
      .and_then(|zone| categories.index_of(zone))
      .unwrap_or(self.selected_column);
    let next = (current as i32 + direction).rem_euclid(len as i32) as usize;
    if let Some(name) = categories.at(next).map(|c| c.name.clone()) {
      self.drag.enter(name);
    }
  }

  // ==========================================================================
  // Mutations
  // ==========================================================================

  fn commit_move(&mut self, pending: PendingMove) {
    let Some(target) = self.categories().get(&pending.category).cloned() else {
      return;
    };
    if self.categories().is_member_of(&pending.issue, &target.name) {
      return;
    }

    let manager = self.services.issues.clone();
    let github = self.services.github.clone();
    let milestone = self.milestone;
    let tx = self.mutation_tx.clone();
    self.saving += 1;

    tokio::spawn(async move {
      let number = pending.issue.number;
      let outcome = match manager.move_to(&pending.issue, &target.name).await {
        Ok(_) => Ok(format!("Moved #{} to {}", number, target.title)),
        Err(e) => {
          warn!(number, category = %target.name, "Failed to move issue: {}", e);
          Err(format!(
            "An error occurred when trying to update #{}: {}",
            number,
            e.message()
          ))
        }
      };
      github.invalidate_issues(milestone);
      let _ = tx.send(outcome);
    });
  }

  fn commit_assignment(&mut self, issue: Issue, assignee: Option<User>) {
    let manager = self.services.issues.clone();
    let github = self.services.github.clone();
    let milestone = self.milestone;
    let tx = self.mutation_tx.clone();
    self.saving += 1;

    tokio::spawn(async move {
      let outcome = match manager.assign_to(&issue, assignee.as_ref()).await {
        Ok(_) => Ok(match &assignee {
          Some(user) => format!("Assigned #{} to {}", issue.number, user.login),
          None => format!("Unassigned #{}", issue.number),
        }),
        Err(e) => {
          warn!(number = issue.number, "Failed to assign issue: {}", e);
          Err(format!(
            "An error occurred when trying to assign #{}: {}",
            issue.number,
            e.message()
          ))
        }
      };
      github.invalidate_issues(milestone);
      let _ = tx.send(outcome);
    });
  }

  fn poll_mutations(&mut self) {
    while let Ok(outcome) = self.mutation_rx.try_recv() {
      self.saving = self.saving.saturating_sub(1);
      match outcome {
        Ok(message) => self.services.flash.info(message),
        Err(message) => self.services.flash.error(message),
      }
      // Reload either way so the board shows what the server has
      self.query.refetch();
    }
  }

  // ==========================================================================
  // Key handling
  // ==========================================================================

  fn handle_picker(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.picker.handle_key(key) {
      KeyResult::NotHandled => None,
      KeyResult::Handled => Some(ViewAction::None),
      KeyResult::Event(AssigneeEvent::Selected(user)) => {
        if let Some(issue) = self.picker_issue.take() {
          self.commit_assignment(issue, user);
        }
        Some(ViewAction::None)
      }
      KeyResult::Event(AssigneeEvent::Cancelled) => {
        self.picker_issue = None;
        Some(ViewAction::None)
      }
    }
  }

  fn handle_drag(&mut self, key: KeyEvent) -> Option<ViewAction> {
    if !self.drag.is_active() {
      return None;
    }
    match key.code {
      KeyCode::Char('h') | KeyCode::Left => self.move_drop_zone(-1),
      KeyCode::Char('l') | KeyCode::Right => self.move_drop_zone(1),
      KeyCode::Enter => {
        if let Some(pending) = self.drag.drop() {
          self.commit_move(pending);
        }
      }
      KeyCode::Esc | KeyCode::Char('m') => self.drag.cancel(),
      _ => {}
    }
    // Other keys are swallowed while dragging
    Some(ViewAction::None)
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.navigate_rows(1),
      KeyCode::Char('k') | KeyCode::Up => self.navigate_rows(-1),
      KeyCode::Char('l') | KeyCode::Right => self.navigate_columns(1),
      KeyCode::Char('h') | KeyCode::Left => self.navigate_columns(-1),
      _ => return None,
    }
    Some(ViewAction::None)
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('m') => {
        if let Some(issue) = self.selected_issue().cloned() {
          self.drag.start(issue);
        }
        Some(ViewAction::None)
      }
      KeyCode::Char('a') => {
        self.open_assignee_picker();
        Some(ViewAction::None)
      }
      KeyCode::Char('r') => {
        self.query.refetch();
        Some(ViewAction::None)
      }
      KeyCode::Char('q') | KeyCode::Esc => Some(ViewAction::Pop),
      _ => None,
    }
  }

  fn open_assignee_picker(&mut self) {
    if !self.services.github.is_logged_in() {
      self
        .services
        .flash
        .info("Log in with --token to assign issues");
      return;
    }
    let Some(issue) = self.selected_issue().cloned() else {
      return;
    };
    let collaborators = self
      .query
      .data()
      .map(|d| d.collaborators.clone())
      .unwrap_or_default();
    self.picker.show(
      format!("Assign #{}", issue.number),
      collaborators,
      issue.assignee.as_ref(),
    );
    self.picker_issue = Some(issue);
  }

  // ==========================================================================
  // Rendering
  // ==========================================================================

  fn render_placeholder(&self, frame: &mut Frame, area: Rect) {
    let (title, content) = match self.query.state() {
      QueryState::Error(e) => (
        format!(" {} (error) ", self.breadcrumb_label()),
        format!("Failed to load board: {}. Press 'r' to retry.", e),
      ),
      _ => (
        format!(" {} (loading...) ", self.breadcrumb_label()),
        "Loading issues...".to_string(),
      ),
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let paragraph = Paragraph::new(content)
      .block(block)
      .style(Style::default().fg(Color::DarkGray))
      .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
  }

  fn render_summary(&self, frame: &mut Frame, area: Rect, data: &BoardData, total: &TimeTotals) {
    let milestone_title = data
      .milestone
      .as_ref()
      .map(|m| m.title.clone())
      .unwrap_or_else(|| "No milestone".to_string());

    let mut spans = vec![
      Span::styled(
        format!(" {} ", data.repository.full_name),
        Style::default().fg(Color::White).bold(),
      ),
      Span::styled("/ ", Style::default().fg(Color::DarkGray)),
      Span::styled(milestone_title, Style::default().fg(Color::Yellow).bold()),
    ];
    if let Some(due) = data.milestone.as_ref().and_then(|m| m.due_on) {
      spans.push(Span::styled(
        format!("  {}", relative_due(due, Utc::now())),
        Style::default().fg(Color::Magenta),
      ));
    }
    if let Some(times) = format_times(total) {
      spans.push(Span::styled(
        format!("  total: {}", times),
        Style::default().fg(Color::Green),
      ));
    }
    if self.query.is_provisional() {
      spans.push(Span::styled("  (cached)", Style::default().fg(Color::DarkGray)));
    }

    let mut lines = vec![Line::from(spans)];
    if let Some(description) = data.milestone.as_ref().and_then(|m| m.description.as_deref()) {
      lines.push(Line::from(Span::styled(
        format!(" {}", description.lines().next().unwrap_or_default()),
        Style::default().fg(Color::Gray),
      )));
    }

    frame.render_widget(Paragraph::new(lines), area);
  }

  fn render_column(&self, frame: &mut Frame, area: Rect, index: usize, bucket: &Bucket) {
    let is_selected = index == self.selected_column;
    let is_drop_zone = self.drag.drop_zone() == Some(bucket.category.name.as_str());

    let border_color = if is_drop_zone {
      Color::Magenta
    } else if is_selected {
      Color::Yellow
    } else {
      Color::Blue
    };

    let mut block = Block::default()
      .title(format!(
        " {} ({}) ",
        truncate(&bucket.category.title, 16),
        bucket.issues().count()
      ))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border_color));
    if let Some(times) = format_times(&bucket.times) {
      block = block.title_bottom(Line::from(format!(" {} ", times)).centered());
    }

    let width = area.width.saturating_sub(4) as usize;
    let dragged_id = self.drag.dragged().map(|i| i.id);
    let category_labels: Vec<&str> = self.categories().labels().collect();

    let items: Vec<ListItem> = bucket
      .cards
      .iter()
      .map(|card| {
        let issue = card.issue.as_ref();
        if card.placeholder {
          return ListItem::new(Line::from(Span::styled(
            format!("+ {}", truncate(&issue.title, width.saturating_sub(2))),
            Style::default().fg(Color::Magenta).italic(),
          )));
        }

        let dimmed = dragged_id == Some(issue.id);
        let title_style = if dimmed {
          Style::default().fg(Color::DarkGray)
        } else {
          Style::default().fg(Color::White)
        };
        let number = format!("#{} ", issue.number);
        let title = truncate(&issue.title, width.saturating_sub(number.len()));
        let mut lines = vec![Line::from(vec![
          Span::styled(number, Style::default().fg(Color::Cyan)),
          Span::styled(title, title_style),
        ])];

        let mut meta = Vec::new();
        if let Some(assignee) = &issue.assignee {
          meta.push(Span::styled(
            format!("@{} ", assignee.login),
            Style::default().fg(Color::Green),
          ));
        }
        if let Some(minutes) = issue.time_estimate {
          meta.push(Span::styled(
            format!("~{} ", format_minutes(minutes)),
            Style::default().fg(Color::Yellow),
          ));
        }
        if let Some(minutes) = issue.time_spent {
          meta.push(Span::styled(
            format!("+{} ", format_minutes(minutes)),
            Style::default().fg(Color::Magenta),
          ));
        }
        for label in issue.labels.iter().filter(|l| {
          !category_labels.contains(&l.name.as_str()) && !self.services.issues.is_time_label(&l.name)
        }) {
          meta.push(Span::styled(
            format!("{} ", label.name),
            Style::default().fg(label_color(&label.color)),
          ));
        }
        if !meta.is_empty() {
          meta.insert(0, Span::raw("  "));
          lines.push(Line::from(meta));
        }

        ListItem::new(lines)
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    if is_selected {
      // The placeholder is not selectable; map the row to its card index
      let card_index = bucket
        .cards
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.placeholder)
        .nth(self.selected_row)
        .map(|(i, _)| i);
      let mut state = ListState::default();
      state.select(card_index);
      frame.render_stateful_widget(list, area, &mut state);
    } else {
      frame.render_widget(list, area);
    }
  }
}

/// "est 1d 2h  spent 3h", or None when neither is known
fn format_times(times: &TimeTotals) -> Option<String> {
  let mut parts = Vec::new();
  if let Some(estimate) = times.estimate {
    parts.push(format!("est {}", format_minutes(estimate)));
  }
  if let Some(spent) = times.spent {
    parts.push(format!("spent {}", format_minutes(spent)));
  }
  (!parts.is_empty()).then(|| parts.join("  "))
}

impl View for BoardView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_picker(key)
      .or_else(|| self.handle_drag(key))
      .or_else(|| self.handle_navigation(key))
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.clamp_selection();

    let Some(data) = self.query.data() else {
      self.render_placeholder(frame, area);
      return;
    };

    let categorized = categorize(&data.issues, self.categories(), self.drag.preview());

    let has_description = data
      .milestone
      .as_ref()
      .is_some_and(|m| m.description.is_some());
    let [summary_area, columns_area] = Layout::vertical([
      Constraint::Length(if has_description { 2 } else { 1 }),
      Constraint::Min(3),
    ])
    .areas(area);

    self.render_summary(frame, summary_area, data, &categorized.total);

    let count = categorized.buckets.len().max(1) as u32;
    let constraints: Vec<Constraint> = categorized
      .buckets
      .iter()
      .map(|_| Constraint::Ratio(1, count))
      .collect();
    let column_areas = Layout::horizontal(constraints).split(columns_area);

    for (index, bucket) in categorized.buckets.iter().enumerate() {
      self.render_column(frame, column_areas[index], index, bucket);
    }

    self.picker.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    self
      .query
      .data()
      .and_then(|d| d.milestone.as_ref().map(|m| m.title.clone()))
      .or_else(|| self.title.clone())
      .unwrap_or_else(|| match self.milestone {
        MilestoneFilter::Number(n) => format!("Milestone {}", n),
        MilestoneFilter::None => "No milestone".to_string(),
      })
  }

  fn tick(&mut self) {
    self.query.poll();
    self.poll_mutations();
    if !self.drag.is_active() && self.saving == 0 {
      self.query.refetch_if_stale();
    }
  }

  fn status(&self) -> Option<String> {
    if let Some(issue) = self.drag.dragged() {
      let target = self
        .drag
        .drop_zone()
        .and_then(|zone| self.categories().get(zone))
        .map(|c| format!(" to {}", c.title))
        .unwrap_or_default();
      return Some(format!("Moving #{}{}", issue.number, target));
    }
    if self.saving > 0 {
      return Some("Saving...".to_string());
    }
    if self.query.is_fetching() && self.query.data().is_some() {
      return Some("Refreshing...".to_string());
    }
    None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.drag.is_active() {
      return vec![
        ShortcutInfo::new("h/l", "target").with_priority(10),
        ShortcutInfo::new("enter", "drop").with_priority(20),
        ShortcutInfo::new("esc", "cancel").with_priority(30),
      ];
    }
    let mut shortcuts = vec![
      ShortcutInfo::new("h/j/k/l", "select").with_priority(10),
      ShortcutInfo::new("m", "move").with_priority(20),
      ShortcutInfo::new("r", "refresh").with_priority(80),
      ShortcutInfo::new("q", "back").with_priority(90),
    ];
    if self.services.github.is_logged_in() {
      shortcuts.push(ShortcutInfo::new("a", "assign").with_priority(30));
    }
    shortcuts
  }
}
