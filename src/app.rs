use crate::event::{Event, EventHandler};
use crate::flash::FlashMessages;
use crate::github::types::MilestoneFilter;
use crate::github::{GithubClient, IssueManager};
use crate::request::LoadingIndicator;
use crate::ui;
use crate::ui::renderfns::HeaderInfo;
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{BoardView, MilestoneListView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::info;

/// Handles shared by every view
#[derive(Clone)]
pub struct Services {
  pub github: GithubClient,
  pub issues: IssueManager,
  pub flash: FlashMessages,
}

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,
  services: Services,
  loading: LoadingIndicator,
  api_url: String,
  tick: usize,
  should_quit: bool,
}

impl App {
  /// Open the milestone list, and the board of `milestone` on top of it if given.
  pub fn new(
    services: Services,
    loading: LoadingIndicator,
    api_url: String,
    milestone: Option<MilestoneFilter>,
  ) -> Self {
    let mut view_stack: Vec<Box<dyn View>> = vec![Box::new(MilestoneListView::new(services.clone()))];
    if let Some(milestone) = milestone {
      view_stack.push(Box::new(BoardView::new(services.clone(), milestone, None)));
    }

    Self {
      view_stack,
      services,
      loading,
      api_url,
      tick: 0,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));
    info!(repo = %self.services.github.repo(), "started");

    let result = self.event_loop(&mut terminal, &mut events).await;

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop<B: Backend>(
    &mut self,
    terminal: &mut Terminal<B>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.on_tick(),
        Some(Event::Resize) => {}
        None => break,
      }
    }
    Ok(())
  }

  fn on_tick(&mut self) {
    self.tick = self.tick.wrapping_add(1);
    // Background views keep polling so their data is current when revealed
    for view in &mut self.view_stack {
      view.tick();
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::Pop,
    };
    self.apply(action);
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  // Accessors for UI rendering

  pub fn current_view_mut(&mut self) -> Option<&mut (dyn View + 'static)> {
    self.view_stack.last_mut().map(|v| v.as_mut())
  }

  pub fn header_info(&self) -> HeaderInfo<'_> {
    HeaderInfo {
      api_url: &self.api_url,
      repository: self.services.github.repo(),
      pending: self.loading.pending_count(),
      flash: self.services.flash.current(),
      shortcuts: self
        .view_stack
        .last()
        .map(|v| v.shortcuts())
        .unwrap_or_default(),
    }
  }

  pub fn tick(&self) -> usize {
    self.tick
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }

  pub fn view_status(&self) -> Option<String> {
    self.view_stack.last().and_then(|v| v.status())
  }
}
