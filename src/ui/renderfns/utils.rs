use chrono::{DateTime, Utc};
use ratatui::prelude::Color;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Terminal color for a GitHub label color (`rrggbb`)
pub fn label_color(hex: &str) -> Color {
  let hex = hex.trim_start_matches('#');
  if hex.len() != 6 {
    return Color::Gray;
  }
  let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2).unwrap_or(""), 16).ok();
  match (channel(0), channel(2), channel(4)) {
    (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
    _ => Color::Gray,
  }
}

/// Human-readable distance to a due date, e.g. "due in 3 days"
pub fn relative_due(due: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let days = (due - now).num_days();
  match days {
    0 if due >= now => "due today".to_string(),
    0 => "due yesterday".to_string(),
    1 => "due tomorrow".to_string(),
    d if d > 1 => format!("due in {} days", d),
    -1 => "due yesterday".to_string(),
    d => format!("{} days overdue", -d),
  }
}
