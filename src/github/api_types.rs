//! Serde-deserializable types matching GitHub REST responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use super::types::{Issue, IssueState, Label, Milestone, Repository, User};
use crate::request::{RequestError, Response};

/// Decode a delivered payload into an API type.
pub fn decode<T: DeserializeOwned>(response: &Response) -> Result<T, RequestError> {
  T::deserialize(&*response.payload).map_err(|e| RequestError::Decode(e.to_string()))
}

// ============================================================================
// Common nested types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiUser {
  pub id: u64,
  pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiLabel {
  pub name: String,
  #[serde(default)]
  pub color: String,
}

// ============================================================================
// Issues
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiIssue {
  pub id: u64,
  pub number: u64,
  #[serde(default)]
  pub title: String,
  pub state: String,
  pub created_at: DateTime<Utc>,
  pub assignee: Option<ApiUser>,
  #[serde(default)]
  pub labels: Vec<ApiLabel>,
  #[serde(default)]
  pub html_url: String,
  /// Present when the "issue" is a pull request
  pub pull_request: Option<Value>,
}

// ============================================================================
// Milestones and repository
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiMilestone {
  pub number: u64,
  pub title: String,
  pub description: Option<String>,
  pub due_on: Option<DateTime<Utc>>,
  #[serde(default)]
  pub open_issues: u64,
  #[serde(default)]
  pub closed_issues: u64,
  #[serde(default)]
  pub html_url: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiRepository {
  pub full_name: String,
  pub name: String,
  pub description: Option<String>,
}

// ============================================================================
// Conversions to domain types
// ============================================================================

impl From<ApiUser> for User {
  fn from(u: ApiUser) -> Self {
    User {
      id: u.id,
      login: u.login,
    }
  }
}

impl From<ApiLabel> for Label {
  fn from(l: ApiLabel) -> Self {
    Label {
      name: l.name,
      color: l.color,
    }
  }
}

impl ApiIssue {
  pub fn is_pull_request(&self) -> bool {
    self.pull_request.is_some()
  }
}

impl From<ApiIssue> for Issue {
  fn from(i: ApiIssue) -> Self {
    Issue {
      id: i.id,
      number: i.number,
      title: i.title,
      state: if i.state == "closed" {
        IssueState::Closed
      } else {
        IssueState::Open
      },
      created_at: i.created_at,
      assignee: i.assignee.map(User::from),
      labels: i.labels.into_iter().map(Label::from).collect(),
      html_url: i.html_url,
      time_spent: None,
      time_estimate: None,
    }
  }
}

impl From<ApiMilestone> for Milestone {
  fn from(m: ApiMilestone) -> Self {
    Milestone {
      number: m.number,
      title: m.title,
      description: m.description.filter(|d| !d.trim().is_empty()),
      due_on: m.due_on,
      open_issues: m.open_issues,
      closed_issues: m.closed_issues,
      html_url: m.html_url,
    }
  }
}

impl From<ApiRepository> for Repository {
  fn from(r: ApiRepository) -> Self {
    Repository {
      full_name: r.full_name,
      name: r.name,
      description: r.description,
    }
  }
}
