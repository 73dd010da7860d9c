//! Short-lived messages shown in the header.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::request::{RequestDescriptor, RequestError, RequestId, RequestNotifier, Response};

const MAX_MESSAGES: usize = 16;
const DEFAULT_TTL: Duration = Duration::from_secs(6);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashLevel {
  Info,
  Error,
}

#[derive(Debug, Clone)]
pub struct FlashMessage {
  pub level: FlashLevel,
  pub text: String,
  posted_at: Instant,
}

/// Shared queue of flash messages; clones post to the same queue.
#[derive(Debug, Clone)]
pub struct FlashMessages {
  messages: Arc<Mutex<VecDeque<FlashMessage>>>,
  ttl: Duration,
}

impl Default for FlashMessages {
  fn default() -> Self {
    Self::new(DEFAULT_TTL)
  }
}

impl FlashMessages {
  pub fn new(ttl: Duration) -> Self {
    Self {
      messages: Arc::new(Mutex::new(VecDeque::new())),
      ttl,
    }
  }

  fn messages(&self) -> MutexGuard<'_, VecDeque<FlashMessage>> {
    self.messages.lock().unwrap_or_else(|e| e.into_inner())
  }

  pub fn post(&self, level: FlashLevel, text: impl Into<String>) {
    let text: String = text.into().chars().filter(|c| !c.is_control()).collect();
    let mut messages = self.messages();
    // Repeated failures of a fan-out group would flood the queue
    if let Some(last) = messages.back_mut() {
      if last.level == level && last.text == text {
        last.posted_at = Instant::now();
        return;
      }
    }
    messages.push_back(FlashMessage {
      level,
      text,
      posted_at: Instant::now(),
    });
    while messages.len() > MAX_MESSAGES {
      messages.pop_front();
    }
  }

  pub fn error(&self, text: impl Into<String>) {
    self.post(FlashLevel::Error, text);
  }

  pub fn info(&self, text: impl Into<String>) {
    self.post(FlashLevel::Info, text);
  }

  /// Most recent message that has not expired
  pub fn current(&self) -> Option<FlashMessage> {
    let mut messages = self.messages();
    let ttl = self.ttl;
    messages.retain(|m| m.posted_at.elapsed() < ttl);
    messages.back().cloned()
  }

  pub fn dismiss(&self) {
    self.messages().clear();
  }
}

impl RequestNotifier for FlashMessages {
  fn register(&self, _id: RequestId, _descriptor: &RequestDescriptor) {}

  fn success(&self, _id: RequestId, _response: &Response) {}

  fn error(&self, _id: RequestId, error: &RequestError) {
    FlashMessages::error(self, format!("Request failed: {}", error.message()));
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_latest_message_wins() {
    let flash = FlashMessages::default();
    assert!(flash.current().is_none());
    flash.info("loaded");
    flash.error("failed");
    let current = flash.current().unwrap();
    assert_eq!(current.level, FlashLevel::Error);
    assert_eq!(current.text, "failed");
  }

  #[test]
  fn test_messages_expire() {
    let flash = FlashMessages::new(Duration::ZERO);
    flash.error("gone");
    assert!(flash.current().is_none());
  }

  #[test]
  fn test_duplicates_collapse_and_control_chars_stripped() {
    let flash = FlashMessages::default();
    flash.error("bad\x1b[31m thing");
    flash.error("bad[31m thing");
    assert_eq!(flash.messages().len(), 1);
    assert_eq!(flash.current().unwrap().text, "bad[31m thing");
  }

  #[test]
  fn test_request_errors_are_posted() {
    let flash = FlashMessages::default();
    let notifier: &dyn RequestNotifier = &flash;
    notifier.error(
      RequestId(1),
      &RequestError::Status {
        status: 404,
        body: json!({"message": "Not Found"}),
      },
    );
    assert_eq!(flash.current().unwrap().text, "Request failed: HTTP 404: Not Found");
  }
}
