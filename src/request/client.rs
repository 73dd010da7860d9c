//! Request client: de-duplication of in-flight GETs, response caching and
//! notifier fan-out.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use super::notifier::RequestNotifier;
use super::transport::{Credentials, HttpRequest, HttpResponse, Transport};
use super::types::{
  Callbacks, Method, RequestDescriptor, RequestError, RequestId, RequestOptions, Response,
  ResponseSource,
};
use crate::auth::TokenStore;
use crate::cache::{CacheEntry, ResponseCache};

/// One caller waiting on a request.
struct Waiter {
  id: RequestId,
  callbacks: Callbacks,
}

/// A GET in flight and everyone waiting on it, in arrival order.
struct OngoingRequest {
  waiters: Vec<Waiter>,
  /// Some waiter asked for the outcome to update the cache
  cached: bool,
}

/// Result shared by every waiter of a request.
struct Delivery {
  payload: Arc<Value>,
  source: ResponseSource,
  etag: Option<String>,
}

#[derive(Default)]
struct SharedState {
  next_id: AtomicU64,
  ongoing: Mutex<HashMap<String, OngoingRequest>>,
  notifiers: Mutex<Vec<Arc<dyn RequestNotifier>>>,
}

impl SharedState {
  fn ongoing(&self) -> MutexGuard<'_, HashMap<String, OngoingRequest>> {
    self.ongoing.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn notifiers(&self) -> MutexGuard<'_, Vec<Arc<dyn RequestNotifier>>> {
    self.notifiers.lock().unwrap_or_else(|e| e.into_inner())
  }
}

/// Entry point for all outbound API calls.
///
/// Cloning yields another handle to the same in-flight table and notifier
/// list.
#[derive(Clone)]
pub struct RequestClient {
  base_url: String,
  transport: Arc<dyn Transport>,
  cache: Option<ResponseCache>,
  tokens: TokenStore,
  state: Arc<SharedState>,
}

impl RequestClient {
  pub fn new(base_url: impl Into<String>, transport: Arc<dyn Transport>, tokens: TokenStore) -> Self {
    Self {
      base_url: base_url.into().trim_end_matches('/').to_string(),
      transport,
      cache: None,
      tokens,
      state: Arc::new(SharedState::default()),
    }
  }

  /// Enable response caching for GET requests.
  pub fn with_cache(mut self, cache: ResponseCache) -> Self {
    self.cache = Some(cache);
    self
  }

  pub fn tokens(&self) -> &TokenStore {
    &self.tokens
  }

  /// Register a notifier. Registering the same notifier twice is a no-op.
  pub fn add_notifier(&self, notifier: Arc<dyn RequestNotifier>) {
    let mut notifiers = self.state.notifiers();
    if !notifiers.iter().any(|n| same_notifier(n, &notifier)) {
      notifiers.push(notifier);
    }
  }

  /// Unregister a notifier. Returns whether it was registered.
  pub fn remove_notifier(&self, notifier: &Arc<dyn RequestNotifier>) -> bool {
    let mut notifiers = self.state.notifiers();
    let before = notifiers.len();
    notifiers.retain(|n| !same_notifier(n, notifier));
    notifiers.len() != before
  }

  pub fn notifier_count(&self) -> usize {
    self.state.notifiers().len()
  }

  /// Number of distinct GET URLs currently in flight.
  pub fn in_flight(&self) -> usize {
    self.state.ongoing().len()
  }

  /// Drop the cached response of a GET, so the next request for it goes
  /// straight to the network.
  pub fn invalidate(&self, descriptor: &RequestDescriptor) {
    if let Some(cache) = &self.cache {
      let url = self.full_url(&descriptor.url);
      if let Err(e) = cache.remove(&url) {
        warn!(url, "Failed to invalidate cached response: {}", e);
      }
    }
  }

  fn notifiers(&self) -> Vec<Arc<dyn RequestNotifier>> {
    self.state.notifiers().clone()
  }

  fn full_url(&self, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
      url.to_string()
    } else {
      format!("{}{}", self.base_url, url)
    }
  }

  /// Issue a request.
  ///
  /// GETs for a URL that is already in flight join the existing call instead
  /// of making a new one. With caching enabled, a valid cached payload is
  /// delivered to `callbacks` before this returns, and the URL is revalidated
  /// with a conditional request.
  pub fn request(
    &self,
    descriptor: RequestDescriptor,
    options: RequestOptions,
    callbacks: Callbacks,
  ) -> RequestId {
    let id = RequestId(self.state.next_id.fetch_add(1, Ordering::Relaxed));
    for notifier in self.notifiers() {
      notifier.register(id, &descriptor);
    }

    let waiter = Waiter { id, callbacks };
    let url = self.full_url(&descriptor.url);
    let credentials = if options.authenticated {
      self
        .tokens
        .access_token()
        .map(|token| Credentials::from_token(&token))
    } else {
      None
    };

    if descriptor.method != Method::Get {
      debug!(%id, method = descriptor.method.as_str(), url, "sending request");
      let request = HttpRequest {
        method: descriptor.method,
        url,
        body: descriptor.body,
        credentials,
        if_modified_since: None,
        if_none_match: None,
      };
      let client = self.clone();
      tokio::spawn(async move {
        let outcome = client
          .transport
          .send(request)
          .await
          .and_then(|response| decode(&response).map(|payload| network(payload, response.etag)));
        client.settle(&waiter, &outcome);
      });
      return id;
    }

    let cache = self.cache.as_ref().filter(|_| options.cached);
    let cached = cache.and_then(|c| match c.get(&url) {
      Ok(entry) => entry,
      Err(e) => {
        warn!(url, "Failed to read response cache: {}", e);
        None
      }
    });

    if let Some(entry) = &cached {
      debug!(%id, url, "serving cached response while revalidating");
      waiter.callbacks.succeed(Response {
        request_id: id,
        payload: Arc::new(entry.payload.clone()),
        source: ResponseSource::Cache,
        etag: entry.etag.clone(),
      });
    }

    {
      let mut ongoing = self.state.ongoing();
      if let Some(request) = ongoing.get_mut(&url) {
        debug!(%id, url, "joining in-flight request");
        request.waiters.push(waiter);
        request.cached |= options.cached;
        return id;
      }
      ongoing.insert(
        url.clone(),
        OngoingRequest {
          waiters: vec![waiter],
          cached: options.cached,
        },
      );
    }

    debug!(%id, url, conditional = cached.is_some(), "sending request");
    let request = HttpRequest {
      method: Method::Get,
      url: url.clone(),
      body: None,
      credentials,
      if_modified_since: cached.as_ref().and_then(CacheEntry::stored_at),
      if_none_match: cached.as_ref().and_then(|e| e.etag.clone()),
    };
    let client = self.clone();
    tokio::spawn(async move {
      // A panicking transport must still release the in-flight entry
      let transport = Arc::clone(&client.transport);
      let result = tokio::spawn(async move { transport.send(request).await })
        .await
        .unwrap_or_else(|e| Err(RequestError::Transport(format!("request task failed: {}", e))));

      let (waiters, cached_group) = client
        .state
        .ongoing()
        .remove(&url)
        .map(|r| (r.waiters, r.cached))
        .unwrap_or_default();
      let cache = if cached_group {
        client.cache.as_ref()
      } else {
        None
      };
      let outcome = resolve_get(&url, cache, cached, result);

      for waiter in &waiters {
        client.settle(waiter, &outcome);
      }
    });

    id
  }

  /// Inform notifiers, then the waiter, of the final outcome.
  fn settle(&self, waiter: &Waiter, outcome: &Result<Delivery, RequestError>) {
    let notifiers = self.notifiers();
    match outcome {
      Ok(delivery) => {
        let response = Response {
          request_id: waiter.id,
          payload: Arc::clone(&delivery.payload),
          source: delivery.source,
          etag: delivery.etag.clone(),
        };
        for notifier in &notifiers {
          notifier.success(waiter.id, &response);
        }
        waiter.callbacks.succeed(response);
      }
      Err(error) => {
        debug!(id = %waiter.id, "request failed: {}", error);
        for notifier in &notifiers {
          notifier.error(waiter.id, error);
        }
        waiter.callbacks.fail(error.clone());
      }
    }
  }
}

fn same_notifier(a: &Arc<dyn RequestNotifier>, b: &Arc<dyn RequestNotifier>) -> bool {
  std::ptr::eq(
    Arc::as_ptr(a) as *const (),
    Arc::as_ptr(b) as *const (),
  )
}

fn network(payload: Value, etag: Option<String>) -> Delivery {
  Delivery {
    payload: Arc::new(payload),
    source: ResponseSource::Network,
    etag,
  }
}

/// Turn a response into its JSON body, or a status error carrying the body
/// exactly as the server sent it.
fn decode(response: &HttpResponse) -> Result<Value, RequestError> {
  if response.is_success() {
    return response.json();
  }
  let body = response
    .json()
    .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&response.body).into_owned()));
  Err(RequestError::Status {
    status: response.status,
    body,
  })
}

/// Resolve a GET against the cache entry it was revalidating, updating the
/// cache with the outcome.
fn resolve_get(
  url: &str,
  cache: Option<&ResponseCache>,
  cached: Option<CacheEntry>,
  result: Result<HttpResponse, RequestError>,
) -> Result<Delivery, RequestError> {
  let outcome = match result {
    Ok(response) if response.is_not_modified() => match cached {
      Some(entry) => Ok(Delivery {
        payload: Arc::new(entry.payload),
        source: ResponseSource::NotModified,
        etag: entry.etag,
      }),
      None => Err(RequestError::Status {
        status: response.status,
        body: Value::Null,
      }),
    },
    Ok(response) => decode(&response).map(|payload| network(payload, response.etag)),
    Err(e) => Err(e),
  };

  if let Some(cache) = cache {
    match &outcome {
      Ok(delivery) => {
        if let Err(e) = cache.store(url, &delivery.payload, delivery.etag.clone()) {
          warn!(url, "Failed to cache response: {}", e);
        }
      }
      Err(_) => {
        if let Err(e) = cache.remove(url) {
          warn!(url, "Failed to evict cache entry: {}", e);
        }
      }
    }
  }

  outcome
}


#[cfg(test)]
mod tests {
  use super::testing::*;
  use super::*;
  use crate::store::MemoryStore;
  use serde_json::json;

  fn recording_callbacks(recorder: &Arc<Recorder>, tag: &str) -> Callbacks {
    let ok = recorder.clone();
    let err = recorder.clone();
    let ok_tag = tag.to_string();
    let err_tag = tag.to_string();
    Callbacks::new()
      .on_success(move |r| {
        ok.push(format!(
          "{} {:?} {} {}",
          ok_tag, r.source, r.request_id, r.payload
        ))
      })
      .on_error(move |e| err.push(format!("{} failed {}", err_tag, e)))
  }

  fn memory_cache() -> ResponseCache {
    ResponseCache::new(Arc::new(MemoryStore::unbounded()))
  }

  #[tokio::test]
  async fn test_concurrent_gets_share_one_network_call() {
    let (transport, gate) =
      FakeTransport::new(|_| Ok(json_response(200, json!({"n": 1})))).gated();
    let transport = Arc::new(transport);
    let client = client(transport.clone());
    let recorder = Arc::new(Recorder::default());

    let ids: Vec<RequestId> = (0..3)
      .map(|i| {
        client.request(
          RequestDescriptor::get("/repos/a/b/issues"),
          RequestOptions::default(),
          recording_callbacks(&recorder, &format!("caller{}", i)),
        )
      })
      .collect();

    wait_for(|| transport.calls() == 1).await;
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    assert_eq!(transport.calls(), 1);
    assert_eq!(client.in_flight(), 1);

    gate.add_permits(1);
    wait_for(|| recorder.entries().len() == 3).await;

    assert_eq!(
      recorder.entries(),
      vec![
        format!("caller0 Network {} {{\"n\":1}}", ids[0]),
        format!("caller1 Network {} {{\"n\":1}}", ids[1]),
        format!("caller2 Network {} {{\"n\":1}}", ids[2]),
      ]
    );
    assert_eq!(client.in_flight(), 0);
  }

  #[tokio::test]
  async fn test_distinct_urls_are_not_deduplicated() {
    let transport = Arc::new(FakeTransport::new(|_| Ok(json_response(200, json!([])))));
    let client = client(transport.clone());

    let a = client.subscribe(RequestDescriptor::get("/a"), RequestOptions::default());
    let b = client.subscribe(RequestDescriptor::get("/b"), RequestOptions::default());
    a.settled().await.unwrap();
    b.settled().await.unwrap();

    assert_eq!(transport.calls(), 2);
  }

  #[tokio::test]
  async fn test_settled_request_is_forgotten() {
    let transport = Arc::new(FakeTransport::new(|_| Ok(json_response(200, json!(1)))));
    let client = client(transport.clone());

    client
      .fetch(RequestDescriptor::get("/a"), RequestOptions::uncached())
      .await
      .unwrap();
    client
      .fetch(RequestDescriptor::get("/a"), RequestOptions::uncached())
      .await
      .unwrap();

    assert_eq!(transport.calls(), 2);
    assert_eq!(client.in_flight(), 0);
  }

  #[tokio::test]
  async fn test_errors_fan_out_to_every_waiter() {
    let (transport, gate) = FakeTransport::new(|_| {
      Ok(json_response(404, json!({"message": "Not Found"})))
    })
    .gated();
    let transport = Arc::new(transport);
    let client = client(transport.clone());

    let first = client.subscribe(RequestDescriptor::get("/x"), RequestOptions::default());
    let second = client.subscribe(RequestDescriptor::get("/x"), RequestOptions::default());
    gate.add_permits(1);

    let expected = RequestError::Status {
      status: 404,
      body: json!({"message": "Not Found"}),
    };
    assert_eq!(first.settled().await.unwrap_err(), expected);
    assert_eq!(second.settled().await.unwrap_err(), expected);
    assert_eq!(transport.calls(), 1);
  }

  #[tokio::test]
  async fn test_valid_cache_entry_served_synchronously_then_revalidated() {
    let transport = Arc::new(FakeTransport::new(|_| {
      Ok(HttpResponse {
        status: 304,
        etag: None,
        body: Vec::new(),
      })
    }));
    let cache = memory_cache();
    cache
      .store_at(
        "https://api.test/repos/a/b",
        &json!({"name": "b"}),
        Some("\"v1\"".into()),
        chrono::Utc::now().timestamp_millis() - 1_000,
      )
      .unwrap();
    let client = client(transport.clone()).with_cache(cache.clone());
    let recorder = Arc::new(Recorder::default());

    let id = client.request(
      RequestDescriptor::get("/repos/a/b"),
      RequestOptions::default(),
      recording_callbacks(&recorder, "c"),
    );

    // Delivered before any await point
    assert_eq!(
      recorder.entries(),
      vec![format!("c Cache {} {{\"name\":\"b\"}}", id)]
    );

    wait_for(|| recorder.entries().len() == 2).await;
    assert_eq!(
      recorder.entries()[1],
      format!("c NotModified {} {{\"name\":\"b\"}}", id)
    );

    let sent = transport.last();
    assert!(sent.is_conditional());
    assert_eq!(sent.if_none_match.as_deref(), Some("\"v1\""));

    // Timestamp refreshed by the 304
    let entry = cache.get("https://api.test/repos/a/b").unwrap().unwrap();
    assert!(entry.stored_at_millis > chrono::Utc::now().timestamp_millis() - 1_000);
  }

  #[tokio::test]
  async fn test_modified_response_overwrites_cache() {
    let transport = Arc::new(FakeTransport::new(|_| {
      Ok(json_response(200, json!({"name": "new"})))
    }));
    let cache = memory_cache();
    cache
      .store("https://api.test/repos/a/b", &json!({"name": "old"}), None)
      .unwrap();
    let client = client(transport.clone()).with_cache(cache.clone());

    let mut sub = client.subscribe(RequestDescriptor::get("/repos/a/b"), RequestOptions::default());
    let first = sub.next().await.unwrap().unwrap();
    assert_eq!(first.source, ResponseSource::Cache);
    assert_eq!(*first.payload, json!({"name": "old"}));

    let settled = sub.settled().await.unwrap();
    assert_eq!(settled.source, ResponseSource::Network);
    assert_eq!(*settled.payload, json!({"name": "new"}));

    let entry = cache.get("https://api.test/repos/a/b").unwrap().unwrap();
    assert_eq!(entry.payload, json!({"name": "new"}));
    assert_eq!(entry.etag.as_deref(), Some("\"etag-200\""));
  }

  #[tokio::test]
  async fn test_error_evicts_cached_url() {
    let transport = Arc::new(FakeTransport::new(|_| {
      Err(RequestError::Transport("connection reset".into()))
    }));
    let cache = memory_cache();
    cache
      .store("https://api.test/repos/a/b", &json!({"name": "old"}), None)
      .unwrap();
    let client = client(transport.clone()).with_cache(cache.clone());

    let err = client
      .fetch(RequestDescriptor::get("/repos/a/b"), RequestOptions::default())
      .await
      .unwrap_err();
    assert_eq!(err, RequestError::Transport("connection reset".into()));
    assert!(cache.get("https://api.test/repos/a/b").unwrap().is_none());
  }

  #[tokio::test]
  async fn test_uncached_option_bypasses_cache() {
    let transport = Arc::new(FakeTransport::new(|_| Ok(json_response(200, json!(2)))));
    let cache = memory_cache();
    cache.store("https://api.test/n", &json!(1), None).unwrap();
    let client = client(transport.clone()).with_cache(cache.clone());

    let mut sub = client.subscribe(RequestDescriptor::get("/n"), RequestOptions::uncached());
    let first = sub.next().await.unwrap().unwrap();
    assert_eq!(first.source, ResponseSource::Network);
    assert!(!transport.last().is_conditional());

    // Untouched by the uncached request
    assert_eq!(
      cache.get("https://api.test/n").unwrap().unwrap().payload,
      json!(1)
    );
  }

  #[tokio::test]
  async fn test_cached_joiner_evicts_entry_when_shared_call_fails() {
    let (transport, gate) = FakeTransport::new(|_| {
      Err(RequestError::Transport("connection reset".into()))
    })
    .gated();
    let transport = Arc::new(transport);
    let cache = memory_cache();
    cache.store("https://api.test/n", &json!(1), None).unwrap();
    let client = client(transport.clone()).with_cache(cache.clone());

    let first = client.subscribe(RequestDescriptor::get("/n"), RequestOptions::uncached());
    let mut second = client.subscribe(RequestDescriptor::get("/n"), RequestOptions::default());
    assert_eq!(
      second.next().await.unwrap().unwrap().source,
      ResponseSource::Cache
    );
    gate.add_permits(1);

    assert!(first.settled().await.is_err());
    assert!(second.settled().await.is_err());
    assert_eq!(transport.calls(), 1);
    assert!(cache.get("https://api.test/n").unwrap().is_none());
  }

  #[tokio::test]
  async fn test_cached_joiner_refreshes_entry_when_shared_call_succeeds() {
    let (transport, gate) = FakeTransport::new(|_| Ok(json_response(200, json!(2)))).gated();
    let transport = Arc::new(transport);
    let cache = memory_cache();
    cache.store("https://api.test/n", &json!(1), None).unwrap();
    let client = client(transport.clone()).with_cache(cache.clone());

    let first = client.subscribe(RequestDescriptor::get("/n"), RequestOptions::uncached());
    let second = client.subscribe(RequestDescriptor::get("/n"), RequestOptions::default());
    gate.add_permits(1);

    assert_eq!(*first.settled().await.unwrap().payload, json!(2));
    assert_eq!(*second.settled().await.unwrap().payload, json!(2));
    assert_eq!(
      cache.get("https://api.test/n").unwrap().unwrap().payload,
      json!(2)
    );
  }

  #[tokio::test]
  async fn test_panicking_transport_releases_in_flight_entry() {
    let transport = Arc::new(FakeTransport::new(|_| panic!("transport blew up")));
    let client = client(transport.clone());

    let err = client
      .fetch(RequestDescriptor::get("/a"), RequestOptions::uncached())
      .await
      .unwrap_err();
    assert!(matches!(err, RequestError::Transport(_)));
    assert_eq!(client.in_flight(), 0);

    // A later request for the same URL is not stuck behind the dead one
    let again = client
      .fetch(RequestDescriptor::get("/a"), RequestOptions::uncached())
      .await;
    assert!(again.is_err());
    assert_eq!(client.in_flight(), 0);
  }

  #[tokio::test]
  async fn test_mutations_are_never_deduplicated_or_cached() {
    let (transport, gate) =
      FakeTransport::new(|_| Ok(json_response(200, json!({"ok": true})))).gated();
    let transport = Arc::new(transport);
    let cache = memory_cache();
    let client = client(transport.clone()).with_cache(cache.clone());

    let a = client.subscribe(
      RequestDescriptor::patch("/repos/a/b/issues/1", json!({"state": "closed"})),
      RequestOptions::default(),
    );
    let b = client.subscribe(
      RequestDescriptor::patch("/repos/a/b/issues/1", json!({"state": "closed"})),
      RequestOptions::default(),
    );
    wait_for(|| transport.calls() == 2).await;
    gate.add_permits(2);

    a.settled().await.unwrap();
    b.settled().await.unwrap();
    assert_eq!(transport.last().method, Method::Patch);
    assert_eq!(transport.last().body, Some(json!({"state": "closed"})));
    assert!(cache.cached_urls().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_authentication_header_follows_option() {
    let transport = Arc::new(FakeTransport::new(|_| Ok(json_response(200, json!(null)))));
    let client = client(transport.clone());
    client.tokens().login("secret", false).unwrap();

    client
      .fetch(RequestDescriptor::get("/user"), RequestOptions::uncached())
      .await
      .unwrap();
    assert_eq!(
      transport.last().credentials,
      Some(Credentials::from_token("secret"))
    );

    let anonymous = RequestOptions {
      authenticated: false,
      cached: false,
    };
    client
      .fetch(RequestDescriptor::get("/user"), anonymous)
      .await
      .unwrap();
    assert_eq!(transport.last().credentials, None);
  }

  #[tokio::test]
  async fn test_no_token_means_no_credentials() {
    let transport = Arc::new(FakeTransport::new(|_| Ok(json_response(200, json!(null)))));
    let client = client(transport.clone());
    client
      .fetch(RequestDescriptor::get("/user"), RequestOptions::default())
      .await
      .unwrap();
    assert_eq!(transport.last().credentials, None);
    assert_eq!(transport.last().url, "https://api.test/user");
  }

  #[tokio::test]
  async fn test_notifiers_see_every_logical_request_once() {
    let (transport, gate) = FakeTransport::new(|_| Ok(json_response(200, json!(1)))).gated();
    let transport = Arc::new(transport);
    let cache = memory_cache();
    cache.store("https://api.test/c", &json!(0), None).unwrap();
    let client = client(transport.clone()).with_cache(cache);
    let recorder = Arc::new(Recorder::default());
    client.add_notifier(recorder.clone());
    client.add_notifier(recorder.clone());
    assert_eq!(client.notifier_count(), 1);

    let a = client.subscribe(RequestDescriptor::get("/c"), RequestOptions::default());
    let b = client.subscribe(RequestDescriptor::get("/c"), RequestOptions::default());
    let c = client.subscribe(RequestDescriptor::get("/d"), RequestOptions::default());
    gate.add_permits(2);
    a.settled().await.unwrap();
    b.settled().await.unwrap();
    c.settled().await.unwrap();

    assert_eq!(recorder.count("register"), 3);
    assert_eq!(recorder.count("success"), 3);
    assert_eq!(recorder.count("error"), 0);
  }

  #[tokio::test]
  async fn test_notifiers_run_before_continuation() {
    let transport = Arc::new(FakeTransport::new(|_| Ok(json_response(500, json!("boom")))));
    let client = client(transport);
    let recorder = Arc::new(Recorder::default());
    client.add_notifier(recorder.clone());

    let id = client.request(
      RequestDescriptor::get("/e"),
      RequestOptions::default(),
      recording_callbacks(&recorder, "c"),
    );
    wait_for(|| recorder.entries().len() == 3).await;

    assert_eq!(
      recorder.entries(),
      vec![
        format!("register {}", id),
        format!("error {}", id),
        "c failed HTTP 500".to_string(),
      ]
    );
  }

  #[tokio::test]
  async fn test_remove_notifier() {
    let transport = Arc::new(FakeTransport::new(|_| Ok(json_response(200, json!(1)))));
    let client = client(transport);
    let recorder: Arc<dyn RequestNotifier> = Arc::new(Recorder::default());
    client.add_notifier(recorder.clone());
    assert!(client.remove_notifier(&recorder));
    assert!(!client.remove_notifier(&recorder));
    assert_eq!(client.notifier_count(), 0);
  }

  #[test]
  fn test_decode_passes_error_body_through() {
    let err = decode(&HttpResponse {
      status: 422,
      etag: None,
      body: br#"{"message":"Validation Failed","errors":[]}"#.to_vec(),
    })
    .unwrap_err();
    assert_eq!(
      err,
      RequestError::Status {
        status: 422,
        body: json!({"message": "Validation Failed", "errors": []}),
      }
    );

    let err = decode(&HttpResponse {
      status: 502,
      etag: None,
      body: b"Bad Gateway".to_vec(),
    })
    .unwrap_err();
    assert_eq!(
      err,
      RequestError::Status {
        status: 502,
        body: json!("Bad Gateway"),
      }
    );
  }
}
