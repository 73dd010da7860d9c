//! HTTP transport used by the request client.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{CONTENT_TYPE, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

use super::types::{Method, RequestError};

/// HTTP Basic credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
  pub username: String,
  pub password: String,
}

impl Credentials {
  /// GitHub accepts a token as the Basic username with `x-oauth-basic` as password.
  pub fn from_token(token: &str) -> Self {
    Self {
      username: token.to_string(),
      password: "x-oauth-basic".to_string(),
    }
  }
}

/// A fully resolved outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
  pub method: Method,
  pub url: String,
  pub body: Option<Value>,
  pub credentials: Option<Credentials>,
  pub if_modified_since: Option<DateTime<Utc>>,
  pub if_none_match: Option<String>,
}

impl HttpRequest {
  pub fn is_conditional(&self) -> bool {
    self.if_modified_since.is_some() || self.if_none_match.is_some()
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
  pub status: u16,
  pub etag: Option<String>,
  pub body: Vec<u8>,
}

impl HttpResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  pub fn is_not_modified(&self) -> bool {
    self.status == 304
  }

  /// Parse the body as JSON; an empty body is `null`.
  pub fn json(&self) -> Result<Value, RequestError> {
    if self.body.iter().all(u8::is_ascii_whitespace) {
      return Ok(Value::Null);
    }
    serde_json::from_slice(&self.body).map_err(|e| RequestError::Decode(e.to_string()))
  }
}

/// A boxed future resolving to a transport result
pub type TransportFuture = Pin<Box<dyn Future<Output = Result<HttpResponse, RequestError>> + Send>>;

/// Something that can perform HTTP requests.
pub trait Transport: Send + Sync {
  fn send(&self, request: HttpRequest) -> TransportFuture;
}

/// Format a timestamp as an HTTP date (RFC 7231 IMF-fixdate).
pub fn http_date(at: DateTime<Utc>) -> String {
  at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Transport backed by reqwest.
#[derive(Clone)]
pub struct ReqwestTransport {
  client: reqwest::Client,
}

impl ReqwestTransport {
  pub fn new() -> Result<Self> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("gitsprint/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;
    Ok(Self { client })
  }
}

impl Transport for ReqwestTransport {
  fn send(&self, request: HttpRequest) -> TransportFuture {
    let method = match request.method {
      Method::Get => reqwest::Method::GET,
      Method::Post => reqwest::Method::POST,
      Method::Patch => reqwest::Method::PATCH,
      Method::Put => reqwest::Method::PUT,
      Method::Delete => reqwest::Method::DELETE,
    };

    let mut builder = self
      .client
      .request(method, &request.url)
      .header("Accept", "application/vnd.github+json");

    if let Some(credentials) = &request.credentials {
      builder = builder.basic_auth(&credentials.username, Some(&credentials.password));
    }
    if let Some(since) = request.if_modified_since {
      builder = builder.header(IF_MODIFIED_SINCE, http_date(since));
    }
    if let Some(etag) = &request.if_none_match {
      builder = builder.header(IF_NONE_MATCH, etag.as_str());
    }
    if let Some(body) = &request.body {
      builder = builder
        .header(CONTENT_TYPE, "application/json")
        .body(body.to_string());
    }

    Box::pin(async move {
      let response = builder
        .send()
        .await
        .map_err(|e| RequestError::Transport(e.to_string()))?;

      let status = response.status().as_u16();
      let etag = response
        .headers()
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
      let body = response
        .bytes()
        .await
        .map_err(|e| RequestError::Transport(e.to_string()))?
        .to_vec();

      Ok(HttpResponse { status, etag, body })
    })
  }
}
