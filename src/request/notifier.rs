//! Observers of request lifecycle events.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::types::{RequestDescriptor, RequestError, RequestId, Response};

/// Observer informed of every logical request.
///
/// `register` is called once when the request is created, then exactly one of
/// `success` or `error` once it settles. Provisional cache deliveries are not
/// reported.
pub trait RequestNotifier: Send + Sync {
  fn register(&self, id: RequestId, descriptor: &RequestDescriptor);

  fn success(&self, id: RequestId, response: &Response);

  fn error(&self, id: RequestId, error: &RequestError);
}

/// Tracks which requests are still pending, for a global loading indicator.
#[derive(Debug, Clone, Default)]
pub struct LoadingIndicator {
  pending: Arc<Mutex<BTreeMap<RequestId, String>>>,
}

impl LoadingIndicator {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, BTreeMap<RequestId, String>> {
    self.pending.lock().unwrap_or_else(|e| e.into_inner())
  }

  pub fn is_loading(&self) -> bool {
    !self.lock().is_empty()
  }

  pub fn pending_count(&self) -> usize {
    self.lock().len()
  }

  /// URL of the oldest pending request.
  pub fn oldest_pending(&self) -> Option<String> {
    self.lock().values().next().cloned()
  }
}

impl RequestNotifier for LoadingIndicator {
  fn register(&self, id: RequestId, descriptor: &RequestDescriptor) {
    self.lock().insert(id, descriptor.url.clone());
  }

  fn success(&self, id: RequestId, _response: &Response) {
    self.lock().remove(&id);
  }

  fn error(&self, id: RequestId, _error: &RequestError) {
    self.lock().remove(&id);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::request::types::ResponseSource;
  use serde_json::Value;

  fn response(id: RequestId) -> Response {
    Response {
      request_id: id,
      payload: Arc::new(Value::Null),
      source: ResponseSource::Network,
      etag: None,
    }
  }

  #[test]
  fn test_loading_indicator_tracks_pending() {
    let indicator = LoadingIndicator::new();
    assert!(!indicator.is_loading());

    indicator.register(RequestId(1), &RequestDescriptor::get("/a"));
    indicator.register(RequestId(2), &RequestDescriptor::get("/b"));
    assert_eq!(indicator.pending_count(), 2);
    assert_eq!(indicator.oldest_pending().as_deref(), Some("/a"));

    indicator.success(RequestId(1), &response(RequestId(1)));
    assert_eq!(indicator.oldest_pending().as_deref(), Some("/b"));

    indicator.error(RequestId(2), &RequestError::Abandoned);
    assert!(!indicator.is_loading());
  }
}
