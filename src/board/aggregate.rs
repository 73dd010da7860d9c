//! Partition of issues into board columns with time totals.

use std::borrow::Cow;

use super::category::{Categories, Category};
use crate::github::types::Issue;

/// Number carried by placeholder cards; above any real issue number
pub const PLACEHOLDER_NUMBER: u64 = 9_999_999_999;

/// An issue being dragged over a column
#[derive(Debug, Clone, Copy)]
pub struct DragPreview<'a> {
  pub issue: &'a Issue,
  pub drop_zone: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Card<'a> {
  pub issue: Cow<'a, Issue>,
  /// Preview of a pending move, not a real issue
  pub placeholder: bool,
}

/// Summed minutes; `None` when no issue contributed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeTotals {
  pub estimate: Option<u32>,
  pub spent: Option<u32>,
}

impl TimeTotals {
  fn add(&mut self, issue: &Issue) {
    accumulate(&mut self.estimate, issue.time_estimate);
    accumulate(&mut self.spent, issue.time_spent);
  }
}

/// Zero minutes count as unknown so a column never shows a bare "0m".
fn accumulate(total: &mut Option<u32>, value: Option<u32>) {
  if let Some(minutes) = value.filter(|&m| m > 0) {
    *total = Some(total.unwrap_or(0).saturating_add(minutes));
  }
}

#[derive(Debug, Clone)]
pub struct Bucket<'a> {
  pub category: &'a Category,
  pub cards: Vec<Card<'a>>,
  pub times: TimeTotals,
}

impl Bucket<'_> {
  /// Cards for real issues, without the placeholder
  pub fn issues(&self) -> impl Iterator<Item = &Issue> {
    self
      .cards
      .iter()
      .filter(|c| !c.placeholder)
      .map(|c| c.issue.as_ref())
  }
}

#[derive(Debug, Clone)]
pub struct Categorized<'a> {
  /// In declared category order
  pub buckets: Vec<Bucket<'a>>,
  pub total: TimeTotals,
}

impl<'a> Categorized<'a> {
  pub fn bucket(&self, name: &str) -> Option<&Bucket<'a>> {
    self.buckets.iter().find(|b| b.category.name == name)
  }
}

/// Sort issues into their categories.
///
/// With a drag preview over a column the issue is not already in, a
/// placeholder copy of the issue is added to that column. Each column is
/// ordered by creation time.
pub fn categorize<'a>(
  issues: &'a [Issue],
  categories: &'a Categories,
  drag: Option<DragPreview<'a>>,
) -> Categorized<'a> {
  let mut buckets: Vec<Bucket<'a>> = categories
    .iter()
    .map(|category| Bucket {
      category,
      cards: Vec::new(),
      times: TimeTotals::default(),
    })
    .collect();

  for issue in issues {
    let name = &categories.category_of(issue).name;
    if let Some(bucket) = buckets.iter_mut().find(|b| &b.category.name == name) {
      bucket.cards.push(Card {
        issue: Cow::Borrowed(issue),
        placeholder: false,
      });
    }
  }

  if let Some(preview) = drag {
    if !categories.is_member_of(preview.issue, preview.drop_zone) {
      if let Some(bucket) = buckets
        .iter_mut()
        .find(|b| b.category.name == preview.drop_zone)
      {
        let mut copy = preview.issue.clone();
        copy.number = PLACEHOLDER_NUMBER;
        bucket.cards.push(Card {
          issue: Cow::Owned(copy),
          placeholder: true,
        });
      }
    }
  }

  let mut total = TimeTotals::default();
  for bucket in &mut buckets {
    bucket.cards.sort_by_key(|c| c.issue.created_at);
    for card in bucket.cards.iter().filter(|c| !c.placeholder) {
      bucket.times.add(&card.issue);
      total.add(&card.issue);
    }
  }

  Categorized { buckets, total }
}
