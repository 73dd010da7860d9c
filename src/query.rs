//! Async query abstraction for data fetching.
//!
//! A `Query<T>` owns the fetching logic of a view and its loading state. The
//! fetch runs on the tokio runtime and reports back over a channel; views poll
//! the query on every tick.
//!
//! # Example
//!
//! ```ignore
//! let github = github_client.clone();
//! let mut query = Query::new(move || {
//!     let github = github.clone();
//!     async move { github.get_milestones().await.map_err(|e| e.message()) }
//! });
//!
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//! ```
//!
//! Fetchers built with [`Query::with_updates`] may push provisional data (for
//! instance a board assembled from cached responses) before the final result.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is fetching and has no data yet
  Loading,
  /// Query has data; `provisional` while a fetch is still revalidating it
  Success { data: T, provisional: bool },
  /// Query failed with an error
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success { data, .. } => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

enum Update<T> {
  Provisional(T),
  Done(Result<T, String>),
}

/// Handle a fetcher uses to publish provisional data.
pub struct UpdateSink<T> {
  tx: mpsc::UnboundedSender<Update<T>>,
}

impl<T> Clone for UpdateSink<T> {
  fn clone(&self) -> Self {
    Self {
      tx: self.tx.clone(),
    }
  }
}

impl<T> UpdateSink<T> {
  pub fn provisional(&self, data: T) {
    // Receiver is gone once the query was refetched or dropped
    let _ = self.tx.send(Update::Provisional(data));
  }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send>>;

type FetcherFn<T> = Box<dyn Fn(UpdateSink<T>) -> BoxFuture<T> + Send + Sync>;

/// Async query for data fetching with state management.
pub struct Query<T> {
  state: QueryState<T>,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Update<T>>>,
  fetched_at: Option<Instant>,
  stale_time: Duration,
}

impl<T: Send + 'static> Query<T> {
  /// Create a query whose fetcher only produces a final result.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self::with_updates(move |_| fetcher())
  }

  /// Create a query whose fetcher may publish provisional data first.
  pub fn with_updates<F, Fut>(fetcher: F) -> Self
  where
    F: Fn(UpdateSink<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Box::new(move |sink| Box::pin(fetcher(sink))),
      receiver: None,
      fetched_at: None,
      stale_time: Duration::from_secs(60),
    }
  }

  /// After this duration, the data is considered stale and `is_stale()` returns true.
  pub fn with_stale_time(mut self, duration: Duration) -> Self {
    self.stale_time = duration;
    self
  }

  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  /// Whether a fetch is running, with or without provisional data.
  pub fn is_fetching(&self) -> bool {
    self.receiver.is_some()
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn is_provisional(&self) -> bool {
    matches!(
      self.state,
      QueryState::Success {
        provisional: true,
        ..
      }
    )
  }

  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Check if the settled data is older than stale_time.
  pub fn is_stale(&self) -> bool {
    match &self.state {
      QueryState::Success {
        provisional: false, ..
      } => self
        .fetched_at
        .map(|t| t.elapsed() > self.stale_time)
        .unwrap_or(true),
      _ => false,
    }
  }

  /// Start fetching data if not already fetching.
  pub fn fetch(&mut self) {
    if self.is_fetching() {
      return;
    }
    self.start_fetch();
  }

  /// Force a refetch, dropping any pending result. Existing data stays
  /// visible until the new result arrives.
  pub fn refetch(&mut self) {
    self.receiver = None;
    self.start_fetch();
  }

  /// Refetch if the data has gone stale. Returns whether a fetch started.
  pub fn refetch_if_stale(&mut self) -> bool {
    if self.is_stale() && !self.is_fetching() {
      self.start_fetch();
      return true;
    }
    false
  }

  /// Apply results from a pending fetch.
  ///
  /// Returns `true` if the state changed. Call this in the event loop tick.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    while let Some(receiver) = &mut self.receiver {
      match receiver.try_recv() {
        Ok(Update::Provisional(data)) => {
          self.state = QueryState::Success {
            data,
            provisional: true,
          };
          changed = true;
        }
        Ok(Update::Done(Ok(data))) => {
          self.state = QueryState::Success {
            data,
            provisional: false,
          };
          self.fetched_at = Some(Instant::now());
          self.receiver = None;
          changed = true;
        }
        Ok(Update::Done(Err(error))) => {
          self.state = QueryState::Error(error);
          self.receiver = None;
          changed = true;
        }
        Err(mpsc::error::TryRecvError::Empty) => break,
        Err(mpsc::error::TryRecvError::Disconnected) => {
          // Sender dropped without sending
          self.state = QueryState::Error("Query was cancelled".to_string());
          self.receiver = None;
          changed = true;
        }
      }
    }
    changed
  }

  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    if self.state.data().is_none() {
      self.state = QueryState::Loading;
    }

    let future = (self.fetcher)(UpdateSink { tx: tx.clone() });
    tokio::spawn(async move {
      let result = future.await;
      let _ = tx.send(Update::Done(result));
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("fetched_at", &self.fetched_at)
      .field("stale_time", &self.stale_time)
      .finish_non_exhaustive()
  }
}
