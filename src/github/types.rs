use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueState {
  Open,
  Closed,
}

impl IssueState {
  pub fn as_str(&self) -> &'static str {
    match self {
      IssueState::Open => "open",
      IssueState::Closed => "closed",
    }
  }
}

/// GitHub user (assignee or collaborator)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
  pub id: u64,
  pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
  pub name: String,
  pub color: String, // hex without '#'
}

/// Issue as shown on the board
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
  pub id: u64,
  pub number: u64,
  pub title: String,
  pub state: IssueState,
  pub created_at: DateTime<Utc>,
  pub assignee: Option<User>,
  pub labels: Vec<Label>,
  pub html_url: String,
  /// Minutes spent, from time labels
  pub time_spent: Option<u32>,
  /// Minutes estimated, from time labels
  pub time_estimate: Option<u32>,
}

impl Issue {
  pub fn has_label(&self, name: &str) -> bool {
    self.labels.iter().any(|l| l.name == name)
  }

  pub fn label_names(&self) -> Vec<String> {
    self.labels.iter().map(|l| l.name.clone()).collect()
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Milestone {
  pub number: u64,
  pub title: String,
  pub description: Option<String>,
  pub due_on: Option<DateTime<Utc>>,
  pub open_issues: u64,
  pub closed_issues: u64,
  pub html_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Repository {
  pub full_name: String,
  pub name: String,
  pub description: Option<String>,
}

/// Which issues of a repository a board shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MilestoneFilter {
  Number(u64),
  /// Issues without a milestone
  None,
}

impl MilestoneFilter {
  pub fn to_query(&self) -> String {
    match self {
      MilestoneFilter::Number(n) => n.to_string(),
      MilestoneFilter::None => "none".to_string(),
    }
  }
}

impl From<Option<u64>> for MilestoneFilter {
  fn from(number: Option<u64>) -> Self {
    number.map_or(MilestoneFilter::None, MilestoneFilter::Number)
  }
}

/// Everything a board view shows
#[derive(Debug, Clone)]
pub struct BoardData {
  pub repository: Repository,
  pub labels: Vec<Label>,
  /// Open issues followed by closed ones
  pub issues: Vec<Issue>,
  /// Empty unless logged in
  pub collaborators: Vec<User>,
  pub milestones: Vec<Milestone>,
  pub milestone: Option<Milestone>,
}
