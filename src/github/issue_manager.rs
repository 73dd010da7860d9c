//! Issue mutations and time-label handling on top of the board categories.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::client::{GithubClient, IssueUpdate};
use super::types::{Issue, IssueState, User};
use crate::board::Categories;
use crate::request::RequestError;

const MINUTES_PER_HOUR: u32 = 60;
const HOURS_PER_DAY: u32 = 8;
const DAYS_PER_WEEK: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeKind {
  Estimate,
  Spent,
}

/// Label prefixes carrying time information, e.g. `time-spent-2h30m`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeLabels {
  pub estimate_prefix: String,
  pub spent_prefix: String,
}

impl Default for TimeLabels {
  fn default() -> Self {
    Self {
      estimate_prefix: "time-estimate-".to_string(),
      spent_prefix: "time-spent-".to_string(),
    }
  }
}

impl TimeLabels {
  fn prefix(&self, kind: TimeKind) -> &str {
    match kind {
      TimeKind::Estimate => &self.estimate_prefix,
      TimeKind::Spent => &self.spent_prefix,
    }
  }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IssueError {
  #[error("unknown category: {0}")]
  UnknownCategory(String),
  #[error(transparent)]
  Request(#[from] RequestError),
}

impl IssueError {
  /// Text for the user, with GitHub's explanation when there is one
  pub fn message(&self) -> String {
    match self {
      IssueError::Request(e) => e.message(),
      other => other.to_string(),
    }
  }
}

/// Applies board semantics to issues: membership, time labels and moves.
#[derive(Clone)]
pub struct IssueManager {
  client: GithubClient,
  categories: Categories,
  time_labels: TimeLabels,
}

impl IssueManager {
  pub fn new(client: GithubClient, categories: Categories, time_labels: TimeLabels) -> Self {
    Self {
      client,
      categories,
      time_labels,
    }
  }

  pub fn categories(&self) -> &Categories {
    &self.categories
  }

  pub fn is_member_of(&self, issue: &Issue, category: &str) -> bool {
    self.categories.is_member_of(issue, category)
  }

  /// Duration text of the first time label of `kind`.
  pub fn get_time<'a>(&self, issue: &'a Issue, kind: TimeKind) -> Option<&'a str> {
    let prefix = self.time_labels.prefix(kind);
    issue
      .labels
      .iter()
      .find_map(|l| l.name.strip_prefix(prefix))
  }

  pub fn is_time_label(&self, name: &str) -> bool {
    name.starts_with(&self.time_labels.estimate_prefix) || name.starts_with(&self.time_labels.spent_prefix)
  }

  pub fn get_minutes(&self, text: &str) -> Option<u32> {
    parse_minutes(text)
  }

  pub fn format_minutes(&self, minutes: u32) -> String {
    format_minutes(minutes)
  }

  /// Fill in time metrics from labels.
  pub fn annotate(&self, issues: &mut [Issue]) {
    for issue in issues {
      issue.time_estimate = self
        .get_time(issue, TimeKind::Estimate)
        .and_then(parse_minutes);
      issue.time_spent = self.get_time(issue, TimeKind::Spent).and_then(parse_minutes);
    }
  }

  /// Move an issue into `category` by rewriting its labels and state.
  pub async fn move_to(&self, issue: &Issue, category: &str) -> Result<Issue, IssueError> {
    let target = self
      .categories
      .get(category)
      .ok_or_else(|| IssueError::UnknownCategory(category.to_string()))?;

    let category_labels: Vec<&str> = self.categories.labels().collect();
    let mut labels: Vec<String> = issue
      .labels
      .iter()
      .map(|l| l.name.clone())
      .filter(|name| !category_labels.contains(&name.as_str()))
      .collect();
    if let Some(label) = target.label() {
      labels.push(label.to_string());
    }
    let state = if target.is_closed() {
      IssueState::Closed
    } else {
      IssueState::Open
    };

    info!(number = issue.number, category, "moving issue");
    let update = IssueUpdate {
      labels: Some(labels),
      state: Some(state),
      assignees: None,
    };
    let mut updated = self.client.update_issue(issue.number, &update).await?;
    self.annotate(std::slice::from_mut(&mut updated));
    Ok(updated)
  }

  /// Assign an issue to a collaborator, or clear its assignee.
  pub async fn assign_to(&self, issue: &Issue, assignee: Option<&User>) -> Result<Issue, IssueError> {
    info!(
      number = issue.number,
      assignee = assignee.map(|u| u.login.as_str()),
      "assigning issue"
    );
    let update = IssueUpdate {
      assignees: Some(assignee.map(|u| u.login.clone()).into_iter().collect()),
      ..Default::default()
    };
    let mut updated = self.client.update_issue(issue.number, &update).await?;
    self.annotate(std::slice::from_mut(&mut updated));
    Ok(updated)
  }
}

/// Parse durations like `1w2d3h30m` (a week is 5 days, a day 8 hours).
pub fn parse_minutes(text: &str) -> Option<u32> {
  let mut total: u32 = 0;
  let mut digits = String::new();
  let mut any = false;

  for c in text.trim().chars() {
    if c.is_ascii_digit() {
      digits.push(c);
      continue;
    }
    let unit = match c {
      'w' => MINUTES_PER_HOUR * HOURS_PER_DAY * DAYS_PER_WEEK,
      'd' => MINUTES_PER_HOUR * HOURS_PER_DAY,
      'h' => MINUTES_PER_HOUR,
      'm' => 1,
      _ => return None,
    };
    let value: u32 = digits.parse().ok()?;
    digits.clear();
    total = total.checked_add(value.checked_mul(unit)?)?;
    any = true;
  }

  if !digits.is_empty() || !any {
    return None;
  }
  Some(total)
}

/// Render minutes as `1w 2d 3h 30m`, omitting zero parts.
pub fn format_minutes(minutes: u32) -> String {
  if minutes == 0 {
    return "0m".to_string();
  }
  let day = MINUTES_PER_HOUR * HOURS_PER_DAY;
  let week = day * DAYS_PER_WEEK;
  let parts = [
    (minutes / week, "w"),
    (minutes % week / day, "d"),
    (minutes % day / MINUTES_PER_HOUR, "h"),
    (minutes % MINUTES_PER_HOUR, "m"),
  ];
  parts
    .iter()
    .filter(|(n, _)| *n > 0)
    .map(|(n, unit)| format!("{}{}", n, unit))
    .collect::<Vec<_>>()
    .join(" ")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::board::category::tests::issue;
  use crate::request::testing::*;
  use serde_json::json;
  use std::sync::Arc;

  fn manager(transport: Arc<FakeTransport>) -> IssueManager {
    let client = GithubClient::new(client(transport), "a/b");
    IssueManager::new(client, Categories::default(), TimeLabels::default())
  }

  fn echo_patch() -> Arc<FakeTransport> {
    Arc::new(FakeTransport::new(|req| {
      let body = req.body.clone().unwrap_or_default();
      let labels: Vec<serde_json::Value> = body["labels"]
        .as_array()
        .map(|l| l.iter().map(|n| json!({"name": n, "color": "ededed"})).collect())
        .unwrap_or_default();
      Ok(json_response(
        200,
        json!({
          "id": 1,
          "number": 1,
          "title": "t",
          "state": body["state"].as_str().unwrap_or("open"),
          "created_at": "2020-01-01T00:00:00Z",
          "assignee": null,
          "labels": labels,
        }),
      ))
    }))
  }

  #[test]
  fn test_parse_minutes() {
    assert_eq!(parse_minutes("30m"), Some(30));
    assert_eq!(parse_minutes("2h"), Some(120));
    assert_eq!(parse_minutes("1d2h30m"), Some(480 + 120 + 30));
    assert_eq!(parse_minutes("1w"), Some(2400));
    assert_eq!(parse_minutes(""), None);
    assert_eq!(parse_minutes("12"), None);
    assert_eq!(parse_minutes("2x"), None);
    assert_eq!(parse_minutes("h"), None);
  }

  #[test]
  fn test_format_minutes() {
    assert_eq!(format_minutes(0), "0m");
    assert_eq!(format_minutes(45), "45m");
    assert_eq!(format_minutes(630), "1d 2h 30m");
    assert_eq!(format_minutes(2400 + 480), "1w 1d");
    assert_eq!(parse_minutes("1d2h30m").map(format_minutes).as_deref(), Some("1d 2h 30m"));
  }

  #[test]
  fn test_annotate_reads_time_labels() {
    let m = manager(echo_patch());
    let mut issues = vec![
      issue(1, 1, &["time-estimate-2h", "time-spent-45m", "time-spent-1d"]),
      issue(2, 1, &["doing"]),
      issue(3, 1, &["time-estimate-soon"]),
    ];
    m.annotate(&mut issues);

    assert_eq!(issues[0].time_estimate, Some(120));
    assert_eq!(issues[0].time_spent, Some(45));
    assert_eq!(issues[1].time_estimate, None);
    assert_eq!(issues[2].time_estimate, None);
    assert_eq!(m.get_time(&issues[0], TimeKind::Spent), Some("45m"));
  }

  #[tokio::test]
  async fn test_move_to_rewrites_category_labels() {
    let transport = echo_patch();
    let m = manager(transport.clone());
    let source = issue(1, 1, &["doing", "bug", "time-spent-1h"]);

    let moved = m.move_to(&source, "awaiting-review").await.unwrap();
    assert_eq!(
      transport.last().body,
      Some(json!({"labels": ["bug", "time-spent-1h", "awaiting-review"], "state": "open"}))
    );
    assert!(m.is_member_of(&moved, "awaiting-review"));
    assert_eq!(moved.time_spent, Some(60));
  }

  #[tokio::test]
  async fn test_move_to_closed_category() {
    let transport = echo_patch();
    let m = manager(transport.clone());
    let moved = m.move_to(&issue(1, 1, &["doing"]), "done").await.unwrap();
    assert_eq!(
      transport.last().body,
      Some(json!({"labels": [], "state": "closed"}))
    );
    assert!(m.is_member_of(&moved, "done"));
  }

  #[tokio::test]
  async fn test_move_to_unknown_category_fails() {
    let transport = echo_patch();
    let m = manager(transport.clone());
    let err = m.move_to(&issue(1, 1, &[]), "shipped").await.unwrap_err();
    assert_eq!(err, IssueError::UnknownCategory("shipped".into()));
    assert_eq!(transport.calls(), 0);
  }

  #[tokio::test]
  async fn test_assign_to_and_unassign() {
    let transport = echo_patch();
    let m = manager(transport.clone());
    let user = User {
      id: 9,
      login: "octocat".into(),
    };

    m.assign_to(&issue(1, 1, &[]), Some(&user)).await.unwrap();
    assert_eq!(transport.last().body, Some(json!({"assignees": ["octocat"]})));

    m.assign_to(&issue(1, 1, &[]), None).await.unwrap();
    assert_eq!(transport.last().body, Some(json!({"assignees": []})));
  }

  #[tokio::test]
  async fn test_move_error_passes_through() {
    let transport = Arc::new(FakeTransport::new(|_| {
      Ok(json_response(422, json!({"message": "Validation Failed"})))
    }));
    let m = manager(transport);
    let err = m.move_to(&issue(1, 1, &[]), "doing").await.unwrap_err();
    assert_eq!(
      err,
      IssueError::Request(RequestError::Status {
        status: 422,
        body: json!({"message": "Validation Failed"})
      })
    );
  }
}
