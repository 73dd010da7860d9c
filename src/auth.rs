//! Access token storage.
//!
//! A token is kept in the session store for the lifetime of the process, or
//! in the durable store when the user asked to be remembered.

use std::sync::Arc;
use tracing::{info, warn};

use crate::store::{read_json, write_json, KeyValueStore, StoreError};

const ACCESS_TOKEN_KEY: &str = "access_token";

#[derive(Clone)]
pub struct TokenStore {
  session: Arc<dyn KeyValueStore>,
  durable: Arc<dyn KeyValueStore>,
}

impl TokenStore {
  pub fn new(session: Arc<dyn KeyValueStore>, durable: Arc<dyn KeyValueStore>) -> Self {
    Self { session, durable }
  }

  /// Store a token. The session store is cleared first so nothing cached for a
  /// previous user survives the login.
  pub fn login(&self, token: &str, remember_me: bool) -> Result<(), StoreError> {
    self.session.clear()?;
    let store = if remember_me {
      &self.durable
    } else {
      &self.session
    };
    write_json(&**store, ACCESS_TOKEN_KEY, token)?;
    info!(remember_me, "logged in");
    Ok(())
  }

  /// Forget the token and everything else kept in either store.
  pub fn logout(&self) -> Result<(), StoreError> {
    self.session.clear()?;
    self.durable.clear()?;
    info!("logged out");
    Ok(())
  }

  /// Current token, session scope first.
  pub fn access_token(&self) -> Option<String> {
    read_token(&*self.session).or_else(|| read_token(&*self.durable))
  }

  pub fn is_logged_in(&self) -> bool {
    self.access_token().is_some()
  }
}

fn read_token(store: &dyn KeyValueStore) -> Option<String> {
  match read_json(store, ACCESS_TOKEN_KEY) {
    Ok(token) => token,
    Err(e) => {
      warn!("Failed to read access token: {}", e);
      None
    }
  }
}
