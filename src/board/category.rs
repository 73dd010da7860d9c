use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};

use crate::github::types::{Issue, IssueState};

/// Membership rule of a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
  /// Open issues carrying the label
  Label(String),
  /// Closed issues
  Closed,
}

impl Rule {
  pub fn matches(&self, issue: &Issue) -> bool {
    match self {
      Rule::Label(name) => issue.state == IssueState::Open && issue.has_label(name),
      Rule::Closed => issue.state == IssueState::Closed,
    }
  }
}

/// A board column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
  pub name: String,
  pub title: String,
  /// Without a rule the category only receives issues as the default.
  /// Written as `rule: {label: doing}` or `rule: closed`.
  #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
  pub rule: Option<Rule>,
}

impl Category {
  pub fn new(name: &str, title: &str, rule: Option<Rule>) -> Self {
    Self {
      name: name.to_string(),
      title: title.to_string(),
      rule,
    }
  }

  pub fn label(&self) -> Option<&str> {
    match &self.rule {
      Some(Rule::Label(name)) => Some(name),
      _ => None,
    }
  }

  pub fn is_closed(&self) -> bool {
    self.rule == Some(Rule::Closed)
  }
}

/// Ordered categories with a designated default.
#[derive(Debug, Clone, PartialEq)]
pub struct Categories {
  list: Vec<Category>,
  default: usize,
}

impl Categories {
  pub fn new(list: Vec<Category>, default: &str) -> Result<Self> {
    if list.is_empty() {
      return Err(eyre!("At least one board category is required"));
    }
    for (i, category) in list.iter().enumerate() {
      if list[..i].iter().any(|c| c.name == category.name) {
        return Err(eyre!("Duplicate board category: {}", category.name));
      }
    }
    let default = list
      .iter()
      .position(|c| c.name == default)
      .ok_or_else(|| eyre!("Default category '{}' is not a configured category", default))?;
    Ok(Self { list, default })
  }

  pub fn iter(&self) -> impl Iterator<Item = &Category> {
    self.list.iter()
  }

  pub fn len(&self) -> usize {
    self.list.len()
  }

  pub fn get(&self, name: &str) -> Option<&Category> {
    self.list.iter().find(|c| c.name == name)
  }

  pub fn at(&self, index: usize) -> Option<&Category> {
    self.list.get(index)
  }

  pub fn index_of(&self, name: &str) -> Option<usize> {
    self.list.iter().position(|c| c.name == name)
  }

  pub fn default_category(&self) -> &Category {
    &self.list[self.default]
  }

  /// First category whose rule matches, else the default.
  pub fn category_of(&self, issue: &Issue) -> &Category {
    self
      .list
      .iter()
      .find(|c| c.rule.as_ref().is_some_and(|r| r.matches(issue)))
      .unwrap_or_else(|| self.default_category())
  }

  pub fn is_member_of(&self, issue: &Issue, category: &str) -> bool {
    self.category_of(issue).name == category
  }

  /// Labels that place an issue in some category
  pub fn labels(&self) -> impl Iterator<Item = &str> {
    self.list.iter().filter_map(Category::label)
  }
}

impl Default for Categories {
  fn default() -> Self {
    Self {
      list: vec![
        Category::new("todo", "To Do", None),
        Category::new("doing", "Doing", Some(Rule::Label("doing".into()))),
        Category::new(
          "awaiting-review",
          "Awaiting Review",
          Some(Rule::Label("awaiting-review".into())),
        ),
        Category::new("done", "Done", Some(Rule::Closed)),
      ],
      default: 0,
    }
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::github::types::Label;
  use chrono::{TimeZone, Utc};

  pub fn issue(number: u64, day: u32, labels: &[&str]) -> Issue {
    Issue {
      id: number,
      number,
      title: format!("Issue {}", number),
      state: IssueState::Open,
      created_at: Utc.with_ymd_and_hms(2020, 1, day, 0, 0, 0).unwrap(),
      assignee: None,
      labels: labels
        .iter()
        .map(|l| Label {
          name: l.to_string(),
          color: "ededed".into(),
        })
        .collect(),
      html_url: String::new(),
      time_spent: None,
      time_estimate: None,
    }
  }

  #[test]
  fn test_first_matching_rule_wins() {
    let categories = Categories::default();
    let both = issue(1, 1, &["awaiting-review", "doing"]);
    assert_eq!(categories.category_of(&both).name, "doing");
  }

  #[test]
  fn test_unmatched_issue_goes_to_default() {
    let categories = Categories::default();
    let plain = issue(1, 1, &["bug"]);
    assert_eq!(categories.category_of(&plain).name, "todo");
    assert!(categories.is_member_of(&plain, "todo"));
    assert!(!categories.is_member_of(&plain, "doing"));
  }

  #[test]
  fn test_closed_issue_ignores_labels() {
    let categories = Categories::default();
    let mut closed = issue(1, 1, &["doing"]);
    closed.state = IssueState::Closed;
    assert_eq!(categories.category_of(&closed).name, "done");
  }

  #[test]
  fn test_new_rejects_bad_configuration() {
    assert!(Categories::new(vec![], "todo").is_err());
    assert!(Categories::new(vec![Category::new("todo", "To Do", None)], "doing").is_err());
    assert!(Categories::new(
      vec![
        Category::new("todo", "To Do", None),
        Category::new("todo", "Again", None)
      ],
      "todo"
    )
    .is_err());
  }

  #[test]
  fn test_labels_lists_label_rules() {
    let categories = Categories::default();
    let labels: Vec<&str> = categories.labels().collect();
    assert_eq!(labels, vec!["doing", "awaiting-review"]);
  }

  #[test]
  fn test_rule_yaml_shape() {
    let category: Category =
      serde_yaml::from_str("name: doing\ntitle: Doing\nrule:\n  label: doing\n").unwrap();
    assert_eq!(category.rule, Some(Rule::Label("doing".into())));
    let category: Category = serde_yaml::from_str("name: done\ntitle: Done\nrule: closed\n").unwrap();
    assert!(category.is_closed());
    let category: Category = serde_yaml::from_str("name: todo\ntitle: To Do\n").unwrap();
    assert_eq!(category.rule, None);
  }

  #[test]
  fn test_rule_yaml_round_trips_as_map() {
    let category = Category::new("doing", "Doing", Some(Rule::Label("doing".into())));
    let yaml = serde_yaml::to_string(&category).unwrap();
    assert!(yaml.contains("label: doing"));
    assert_eq!(serde_yaml::from_str::<Category>(&yaml).unwrap(), category);
  }
}
