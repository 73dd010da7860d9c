//! Channel-backed access to request deliveries.

use futures::future::join_all;
use tokio::sync::mpsc;

use super::client::RequestClient;
use super::types::{Callbacks, RequestDescriptor, RequestError, RequestId, RequestOptions, Response};

type Delivery = Result<Response, RequestError>;

/// Deliveries of one request, in order: an optional provisional cache
/// delivery followed by the settled result.
pub struct Subscription {
  id: RequestId,
  rx: mpsc::UnboundedReceiver<Delivery>,
}

impl Subscription {
  pub fn id(&self) -> RequestId {
    self.id
  }

  /// Next delivery, or `None` once the request has settled and been dropped.
  pub async fn next(&mut self) -> Option<Delivery> {
    self.rx.recv().await
  }

  /// Skip provisional deliveries and wait for the settled result.
  pub async fn settled(mut self) -> Delivery {
    while let Some(delivery) = self.next().await {
      match delivery {
        Ok(response) if response.is_provisional() => continue,
        other => return other,
      }
    }
    Err(RequestError::Abandoned)
  }
}

impl RequestClient {
  /// Issue a request whose deliveries are read from a channel.
  pub fn subscribe(&self, descriptor: RequestDescriptor, options: RequestOptions) -> Subscription {
    let (tx, rx) = mpsc::unbounded_channel();
    let err_tx = tx.clone();

    let callbacks = Callbacks::new()
      .on_success(move |response| {
        // Receiver may have been dropped
        let _ = tx.send(Ok(response));
      })
      .on_error(move |error| {
        let _ = err_tx.send(Err(error));
      });

    let id = self.request(descriptor, options, callbacks);
    Subscription { id, rx }
  }

  /// Issue a request and wait for its settled result.
  pub async fn fetch(
    &self,
    descriptor: RequestDescriptor,
    options: RequestOptions,
  ) -> Result<Response, RequestError> {
    self.subscribe(descriptor, options).settled().await
  }
}

/// Wait for a group of requests.
///
/// The first delivery of every subscription is awaited; if any came from the
/// cache, the whole first round is handed to `on_provisional` so a caller can
/// render stale data while revalidation finishes. Then every settled result is
/// returned in subscription order. The first error wins.
pub async fn settle_all<F>(
  mut subscriptions: Vec<Subscription>,
  on_provisional: F,
) -> Result<Vec<Response>, RequestError>
where
  F: FnOnce(&[Response]),
{
  let firsts = join_all(subscriptions.iter_mut().map(|s| async move {
    s.next().await.unwrap_or(Err(RequestError::Abandoned))
  }))
  .await;
  let firsts = firsts.into_iter().collect::<Result<Vec<_>, _>>()?;

  if firsts.iter().any(Response::is_provisional) {
    on_provisional(&firsts);
  }

  let settled = join_all(
    subscriptions
      .into_iter()
      .zip(firsts)
      .map(|(subscription, first)| async move {
        if first.is_provisional() {
          subscription.settled().await
        } else {
          Ok(first)
        }
      }),
  )
  .await;

  settled.into_iter().collect()
}
