//! Shared state store port.
//!
//! A flat key/value space shared with unrelated consumers. Each key has a
//! single logical writer: the first owner to write a key claims it, and
//! writes from any other owner are rejected.

use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;

/// Keys written by the token cache.
pub mod keys {
    pub const AUTH_SESSION_TOKEN: &str = "Auth.SessionToken";
    pub const AUTH_RETCODE: &str = "Auth.Retcode";
    pub const AUTH_EXPIRES_AT: &str = "Auth.ExpiresAt";
}

/// Last-write-wins key/value store with per-key ownership.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    /// Write `value` under `key` on behalf of `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyOwned`](crate::error::Error::KeyOwned) if another
    /// owner already claimed the key.
    fn set(&self, owner: &str, key: &str, value: Value) -> Result<()>;
}

/// A component's write handle onto the store.
#[derive(Clone)]
pub struct StateWriter {
    store: Arc<dyn StateStore>,
    owner: String,
}

impl StateWriter {
    pub fn new(store: Arc<dyn StateStore>, owner: impl Into<String>) -> Self {
        Self {
            store,
            owner: owner.into(),
        }
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Write a key this component owns.
    ///
    /// # Errors
    ///
    /// Fails if the key belongs to another owner.
    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        self.store.set(&self.owner, key, value)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.store.get(key)
    }
}

impl std::fmt::Debug for StateWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateWriter")
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}
