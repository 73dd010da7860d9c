use super::aggregate::DragPreview;
use crate::github::types::Issue;

/// Keyboard drag-and-drop of a card between columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
  #[default]
  Idle,
  Dragging(Issue),
  Hovering { issue: Issue, drop_zone: String },
}

/// A drop waiting to be sent to the server
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMove {
  pub issue: Issue,
  pub category: String,
}

impl DragState {
  /// Pick up an issue, replacing any drag in progress.
  pub fn start(&mut self, issue: Issue) {
    *self = DragState::Dragging(issue);
  }

  /// Hover over a column. Ignored when nothing is picked up.
  pub fn enter(&mut self, drop_zone: impl Into<String>) {
    let issue = match std::mem::take(self) {
      DragState::Idle => return,
      DragState::Dragging(issue) | DragState::Hovering { issue, .. } => issue,
    };
    *self = DragState::Hovering {
      issue,
      drop_zone: drop_zone.into(),
    };
  }

  /// Release the issue. Yields a move only when hovering over a column.
  pub fn drop(&mut self) -> Option<PendingMove> {
    match std::mem::take(self) {
      DragState::Hovering { issue, drop_zone } => Some(PendingMove {
        issue,
        category: drop_zone,
      }),
      _ => None,
    }
  }

  pub fn cancel(&mut self) {
    *self = DragState::Idle;
  }

  pub fn is_active(&self) -> bool {
    !matches!(self, DragState::Idle)
  }

  pub fn dragged(&self) -> Option<&Issue> {
    match self {
      DragState::Idle => None,
      DragState::Dragging(issue) | DragState::Hovering { issue, .. } => Some(issue),
    }
  }

  pub fn drop_zone(&self) -> Option<&str> {
    match self {
      DragState::Hovering { drop_zone, .. } => Some(drop_zone),
      _ => None,
    }
  }

  pub fn preview(&self) -> Option<DragPreview<'_>> {
    match self {
      DragState::Hovering { issue, drop_zone } => Some(DragPreview { issue, drop_zone }),
      _ => None,
    }
  }
}
