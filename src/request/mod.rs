//! Outbound HTTP request layer.
//!
//! All API calls go through a [`RequestClient`], which:
//! - issues at most one network call per distinct GET URL at a time, fanning
//!   the result out to every caller that asked for it meanwhile
//! - serves valid cached GET responses immediately and revalidates them with a
//!   conditional request
//! - informs registered [`RequestNotifier`]s of every request's lifecycle

mod client;
mod notifier;
mod subscription;
mod transport;
mod types;

pub use client::RequestClient;
pub use notifier::{LoadingIndicator, RequestNotifier};
pub use subscription::settle_all;
pub use transport::ReqwestTransport;
pub use types::{RequestDescriptor, RequestError, RequestId, RequestOptions, Response};

#[cfg(test)]
pub(crate) use types::Method;

#[cfg(test)]
pub(crate) use client::testing;
