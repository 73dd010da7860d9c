//! Request descriptors, options, responses and errors.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Identifier of one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
  Get,
  Post,
  Patch,
  Put,
  Delete,
}

impl Method {
  pub fn as_str(&self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Patch => "PATCH",
      Method::Put => "PUT",
      Method::Delete => "DELETE",
    }
  }
}

/// What to call: method, API path (relative to the base URL) and body.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
  pub method: Method,
  pub url: String,
  pub body: Option<Value>,
}

impl RequestDescriptor {
  pub fn get(url: impl Into<String>) -> Self {
    Self {
      method: Method::Get,
      url: url.into(),
      body: None,
    }
  }

  pub fn patch(url: impl Into<String>, body: Value) -> Self {
    Self {
      method: Method::Patch,
      url: url.into(),
      body: Some(body),
    }
  }
}

/// Per-request flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
  /// Attach the stored access token
  pub authenticated: bool,
  /// Serve from and write to the response cache (GET only)
  pub cached: bool,
}

impl Default for RequestOptions {
  fn default() -> Self {
    Self {
      authenticated: true,
      cached: true,
    }
  }
}

impl RequestOptions {
  pub fn uncached() -> Self {
    Self {
      cached: false,
      ..Self::default()
    }
  }
}

/// Where a delivered payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
  /// Fresh body from the network
  Network,
  /// Provisional payload served from the cache while revalidating
  Cache,
  /// Server answered 304; cached payload confirmed
  NotModified,
}

/// A payload delivered to a success continuation.
#[derive(Debug, Clone)]
pub struct Response {
  pub request_id: RequestId,
  pub payload: Arc<Value>,
  pub source: ResponseSource,
  pub etag: Option<String>,
}

impl Response {
  /// Whether this is a provisional cache delivery that will be followed by
  /// the revalidated result.
  pub fn is_provisional(&self) -> bool {
    self.source == ResponseSource::Cache
  }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
  #[error("transport error: {0}")]
  Transport(String),
  /// Non-success status; `body` is passed through as the server sent it.
  #[error("HTTP {status}")]
  Status { status: u16, body: Value },
  #[error("failed to decode response: {0}")]
  Decode(String),
  #[error("request was abandoned before it settled")]
  Abandoned,
}

impl RequestError {
  pub fn status(&self) -> Option<u16> {
    match self {
      RequestError::Status { status, .. } => Some(*status),
      _ => None,
    }
  }

  /// GitHub error bodies carry a `message` field.
  pub fn message(&self) -> String {
    match self {
      RequestError::Status { status, body } => body
        .get("message")
        .and_then(|m| m.as_str())
        .map(|m| format!("HTTP {}: {}", status, m))
        .unwrap_or_else(|| self.to_string()),
      _ => self.to_string(),
    }
  }
}

pub type SuccessFn = Box<dyn Fn(Response) + Send + Sync>;
pub type ErrorFn = Box<dyn Fn(RequestError) + Send + Sync>;

/// Success and error continuations of one caller.
///
/// The success continuation can run twice for a cached GET: once with the
/// cached payload, once with the revalidated one.
#[derive(Default)]
pub struct Callbacks {
  on_success: Option<SuccessFn>,
  on_error: Option<ErrorFn>,
}

impl Callbacks {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn on_success(mut self, f: impl Fn(Response) + Send + Sync + 'static) -> Self {
    self.on_success = Some(Box::new(f));
    self
  }

  pub fn on_error(mut self, f: impl Fn(RequestError) + Send + Sync + 'static) -> Self {
    self.on_error = Some(Box::new(f));
    self
  }

  pub(crate) fn succeed(&self, response: Response) {
    if let Some(f) = &self.on_success {
      f(response);
    }
  }

  pub(crate) fn fail(&self, error: RequestError) {
    if let Some(f) = &self.on_error {
      f(error);
    }
  }
}

impl fmt::Debug for Callbacks {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Callbacks")
      .field("on_success", &self.on_success.is_some())
      .field("on_error", &self.on_error.is_some())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_default_options() {
    let opts = RequestOptions::default();
    assert!(opts.authenticated);
    assert!(opts.cached);
    assert!(!RequestOptions::uncached().cached);
  }

  #[test]
  fn test_error_message_uses_github_body() {
    let err = RequestError::Status {
      status: 404,
      body: json!({"message": "Not Found"}),
    };
    assert_eq!(err.message(), "HTTP 404: Not Found");
    assert_eq!(err.status(), Some(404));

    let err = RequestError::Status {
      status: 500,
      body: json!("oops"),
    };
    assert_eq!(err.message(), "HTTP 500");
  }

  #[test]
  fn test_callbacks_without_handlers_are_noops() {
    let callbacks = Callbacks::new();
    callbacks.fail(RequestError::Abandoned);
    assert_eq!(
      format!("{:?}", callbacks),
      "Callbacks { on_success: false, on_error: false }"
    );
  }
}
