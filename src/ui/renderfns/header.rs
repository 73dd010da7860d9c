use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::flash::{FlashLevel, FlashMessage};
use crate::ui::view::ShortcutInfo;

/// What the header shows besides the logo
pub struct HeaderInfo<'a> {
  pub api_url: &'a str,
  pub repository: &'a str,
  /// Pending request count from the loading indicator
  pub pending: usize,
  pub flash: Option<FlashMessage>,
  pub shortcuts: Vec<ShortcutInfo>,
}

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// Draw the header bar with logo, context, activity and shortcuts
pub fn draw_header(frame: &mut Frame, area: Rect, info: &HeaderInfo, tick: usize) {
  let mut spans = vec![
    Span::styled(" gitsprint ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", extract_domain(info.api_url)),
      Style::default().fg(Color::White),
    ),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", info.repository),
      Style::default().fg(Color::Yellow).bold(),
    ),
  ];

  if info.pending > 0 {
    spans.push(Span::styled(
      format!(" {} {} ", SPINNER[tick % SPINNER.len()], info.pending),
      Style::default().fg(Color::Magenta),
    ));
  }

  spans.push(Span::raw("  "));

  if let Some(flash) = &info.flash {
    let color = match flash.level {
      FlashLevel::Error => Color::Red,
      FlashLevel::Info => Color::Green,
    };
    spans.push(Span::styled(flash.text.clone(), Style::default().fg(color)));
  } else {
    let mut shortcuts = info.shortcuts.clone();
    shortcuts.sort_by_key(|s| s.priority);
    for shortcut in shortcuts {
      // Keys and brackets highlighted, descriptions dimmed
      spans.push(Span::styled(
        format!("<{}>", shortcut.key),
        Style::default().fg(Color::Cyan),
      ));
      spans.push(Span::styled(
        format!(" {}   ", shortcut.label),
        Style::default().fg(Color::DarkGray),
      ));
    }
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Extract the host from the API URL
fn extract_domain(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_extract_domain() {
    assert_eq!(extract_domain("https://api.github.com"), "api.github.com");
    assert_eq!(
      extract_domain("https://github.example.com/api/v3"),
      "github.example.com"
    );
    assert_eq!(extract_domain("http://localhost:8080"), "localhost:8080");
  }
}
